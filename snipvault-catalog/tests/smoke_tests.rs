//! End-to-end smoke tests for the Snipvault catalog

use snipvault_catalog::{
    fixtures, parse_item_id, parse_user_id, seed_catalog, CatalogConfig, CatalogService,
    ErrorBody, ErrorCode,
};
use snipvault_core::{Caller, CatalogResult, SearchRequest, UserId};

#[tokio::test]
async fn smoke_test_seed_search_rate_favorite() -> CatalogResult<()> {
    let service = CatalogService::in_memory(CatalogConfig::default())?;
    let items = seed_catalog(&service, 100, 42).await?;
    assert_eq!(items.len(), 100);

    // Every language in the pool is searchable by name.
    let python = service
        .search_items(SearchRequest::new().keyword("python"), Caller::Anonymous)
        .await?;
    let expected = items.iter().filter(|i| i.language == "python").count() as u64;
    assert_eq!(python.total, expected);

    let browse = service
        .search_items(SearchRequest::new().page_size(100), Caller::Anonymous)
        .await?;
    assert_eq!(browse.total, 100);
    assert_eq!(browse.items.len(), 50);

    // Ids arrive as strings from the transport layer.
    let user = parse_user_id(&UserId::now_v7().to_string())?;
    let target = parse_item_id(&items[0].item_id.to_string())?;

    let outcome = service.rate(user, target, 5).await?;
    assert_eq!(outcome.your_rating, 5);
    assert_eq!(outcome.item.rating_count, 1);

    service.favorite(user, target).await?;
    let favorites = service.list_favorites(user, None, None).await?;
    assert_eq!(favorites.total, 1);
    assert_eq!(favorites.items[0].your_rating, Some(5));

    let popular = service
        .search_items(SearchRequest::new(), Caller::User(user))
        .await?;
    assert_eq!(popular.items[0].item.item_id, target);
    assert_eq!(popular.items[0].your_rating, Some(5));

    service.health_check().await?;
    Ok(())
}

#[tokio::test]
async fn smoke_test_errors_render_for_transport() {
    let service = CatalogService::in_memory(CatalogConfig::default()).expect("service");
    let item = service
        .ingest(fixtures::generate(1, 3).remove(0))
        .await
        .expect("ingest");

    let err = service
        .rate(UserId::now_v7(), item.item_id, 9)
        .await
        .expect_err("out of range");
    let body = ErrorBody::from(&err);
    assert_eq!(body.code, ErrorCode::InvalidRange);
    assert_eq!(body.status_code(), 400);

    let err = parse_item_id("not-an-id").expect_err("malformed");
    let json = serde_json::to_value(ErrorBody::from(err)).expect("json");
    assert_eq!(json["code"], "INVALID_ID");

    let err = service
        .get_item(snipvault_core::ItemId::now_v7())
        .await
        .expect_err("missing");
    assert_eq!(ErrorBody::from(&err).status_code(), 404);
}
