//! Deterministic demo catalogue.
//!
//! Generates small snippets across a fixed set of languages and tags. The
//! same seed always yields the same titles, languages and tags.

use futures_util::future::try_join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snipvault_core::{CatalogResult, Item, NewItem};

use crate::service::CatalogService;

pub const LANGUAGES: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "go",
    "java",
    "cpp",
    "rust",
    "sql",
    "bash",
];

pub const TAG_POOL: &[&str] = &[
    "auth",
    "db",
    "api",
    "ui",
    "utils",
    "performance",
    "security",
    "testing",
    "script",
    "cli",
];

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool[rng.random_range(0..pool.len())]
}

fn sample_body(language: &str, n: usize) -> String {
    match language {
        "javascript" | "typescript" => format!(
            "function example{n}(a, b) {{\n  return a + b;\n}}\n\nconsole.log(example{n}(1,2));"
        ),
        "python" => format!("def example{n}(a, b):\n    return a + b\n\nprint(example{n}(1,2))"),
        "go" => "package main\nimport \"fmt\"\nfunc main(){ fmt.Println(1+2) }".to_string(),
        "sql" => format!("-- Example query\nSELECT * FROM users WHERE id = {n};"),
        "bash" => "#!/bin/bash\necho $((1 + 2))".to_string(),
        "rust" => "fn main(){ println!(\"{}\", 1+2); }".to_string(),
        other => format!("// {other} example {n}\nfn main() {{}}"),
    }
}

/// Build `count` snippet payloads, numbered from 1.
///
/// Each gets one to three tags drawn with replacement; duplicates are
/// collapsed on ingest.
pub fn generate(count: usize, seed: u64) -> Vec<NewItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=count)
        .map(|n| {
            let language = pick(&mut rng, LANGUAGES);
            let tag_count = rng.random_range(1..=3);
            let tags: Vec<&str> = (0..tag_count).map(|_| pick(&mut rng, TAG_POOL)).collect();
            NewItem::new(format!("{language} snippet {n}"))
                .with_description(format!("A small {language} snippet for {}", tags.join(", ")))
                .with_language(language)
                .with_tags(tags)
                .with_body(sample_body(language, n))
        })
        .collect()
}

/// Generate and ingest `count` snippets concurrently.
pub async fn seed_catalog(
    service: &CatalogService,
    count: usize,
    seed: u64,
) -> CatalogResult<Vec<Item>> {
    let ingests = generate(count, seed)
        .into_iter()
        .map(|new_item| service.ingest(new_item));
    let items = try_join_all(ingests).await?;
    tracing::info!(count = items.len(), seed, "demo catalogue seeded");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(generate(20, 7), generate(20, 7));
    }

    #[test]
    fn test_generated_payloads_use_pools() {
        for (i, item) in generate(50, 42).iter().enumerate() {
            assert!(LANGUAGES.contains(&item.language.as_str()));
            assert!((1..=3).contains(&item.tags.len()));
            assert!(item.tags.iter().all(|t| TAG_POOL.contains(&t.as_str())));
            assert_eq!(item.title, format!("{} snippet {}", item.language, i + 1));
            assert!(!item.body.is_empty());
        }
    }

    #[test]
    fn test_sample_body_falls_back() {
        assert_eq!(sample_body("java", 3), "// java example 3\nfn main() {}");
        assert!(sample_body("python", 9).contains("def example9"));
    }

    #[tokio::test]
    async fn test_seed_catalog_ingests_everything() {
        let service = CatalogService::in_memory(CatalogConfig::default()).unwrap();
        let items = seed_catalog(&service, 30, 1).await.unwrap();
        assert_eq!(items.len(), 30);
        for item in &items {
            assert_eq!(service.get_item(item.item_id).await.unwrap().title, item.title);
        }
    }
}
