//! Address hierarchy, name registration and full-name cascade against a real
//! database. Skipped when `TEST_DATABASE_URL` is unset.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use gazetteer_admin::config::DirectoryConfig;
use gazetteer_admin::db::{AddressRepository, FullNameRepository, ItemRepository, NameRepository};
use gazetteer_admin::models::Address;
use gazetteer_admin::services::{DirectoryError, DirectoryService};
use gazetteer_core::{
    AddressId, AddressKind, CascadeError, HierarchyError, ItemName, PlaceName,
};
use gazetteer_integration_tests::{directory_config, test_pool, unique};
use sqlx::PgPool;

async fn create(pool: &PgPool, kind: &str, parent: Option<AddressId>) -> Address {
    DirectoryService::new(pool, directory_config())
        .create_address(&AddressKind::parse(kind).unwrap(), parent)
        .await
        .unwrap()
}

async fn name(pool: &PgPool, address: AddressId, name: &str) -> Vec<String> {
    DirectoryService::new(pool, directory_config())
        .register_name(address, &PlaceName::parse(name).unwrap())
        .await
        .unwrap()
        .full_names
        .into_iter()
        .map(|entry| entry.full_name)
        .collect()
}

async fn full_names(pool: &PgPool, address: AddressId) -> Vec<String> {
    FullNameRepository::new(pool)
        .for_address(address)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.full_name)
        .collect()
}

async fn latest(pool: &PgPool, address: AddressId) -> Option<String> {
    FullNameRepository::new(pool)
        .latest(address)
        .await
        .unwrap()
        .map(|entry| entry.full_name)
}

#[tokio::test]
async fn test_rename_cascades_to_descendants() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let country = create(&pool, "country", None).await;
    let city = create(&pool, "city", Some(country.id)).await;

    assert_eq!(name(&pool, country.id, "Germany").await, ["country Germany"]);
    assert_eq!(
        name(&pool, city.id, "Berlin").await,
        ["country Germany city Berlin"]
    );
    assert_eq!(
        name(&pool, country.id, "Deutschland").await,
        ["country Deutschland", "country Deutschland city Berlin"]
    );

    assert_eq!(
        latest(&pool, city.id).await.as_deref(),
        Some("country Deutschland city Berlin")
    );
    assert_eq!(
        full_names(&pool, city.id).await,
        ["country Germany city Berlin", "country Deutschland city Berlin"]
    );

    let names = NameRepository::new(&pool).for_address(country.id).await.unwrap();
    let names: Vec<&str> = names.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["Germany", "Deutschland"]);

    let latest_name = NameRepository::new(&pool).latest(country.id).await.unwrap();
    assert_eq!(latest_name.unwrap().name, "Deutschland");
}

#[tokio::test]
async fn test_every_parent_full_name_is_extended() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let country = create(&pool, "country", None).await;
    let city = create(&pool, "city", Some(country.id)).await;

    name(&pool, country.id, "Italia").await;
    name(&pool, country.id, "Italy").await;

    // One row per full name of the parent, in id order.
    assert_eq!(
        name(&pool, city.id, "Rome").await,
        ["country Italia city Rome", "country Italy city Rome"]
    );
    assert_eq!(
        latest(&pool, city.id).await.as_deref(),
        Some("country Italy city Rome")
    );
}

#[tokio::test]
async fn test_unnamed_descendant_stops_the_cascade() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let country = create(&pool, "country", None).await;
    let region = create(&pool, "region", Some(country.id)).await;
    let city = create(&pool, "city", Some(region.id)).await;
    name(&pool, city.id, "Lyon").await;

    assert_eq!(name(&pool, country.id, "France").await, ["country France"]);
    assert!(full_names(&pool, region.id).await.is_empty());
    // Only the city's own registration, made while it had no named parent.
    assert_eq!(full_names(&pool, city.id).await, ["city Lyon"]);

    let summary = AddressRepository::new(&pool)
        .summary(region.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.label(), format!("region {}", region.id));
}

#[tokio::test]
async fn test_cascade_limit_rolls_back_the_name() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let country = create(&pool, "country", None).await;
    let city = create(&pool, "city", Some(country.id)).await;
    name(&pool, city.id, "Porto").await;

    let tight = DirectoryConfig {
        max_cascade_entries: 1,
        ..DirectoryConfig::default()
    };
    let err = DirectoryService::new(&pool, tight)
        .register_name(country.id, &PlaceName::parse("Portugal").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::Cascade(CascadeError::TooLarge { limit: 1 })
    ));

    assert!(NameRepository::new(&pool).latest(country.id).await.unwrap().is_none());
    assert!(full_names(&pool, country.id).await.is_empty());
    assert_eq!(full_names(&pool, city.id).await, ["city Porto"]);
}

#[tokio::test]
async fn test_register_on_missing_address() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let err = DirectoryService::new(&pool, directory_config())
        .register_name(AddressId::new(i32::MAX), &PlaceName::parse("Nowhere").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::AddressNotFound(_)));
}

#[tokio::test]
async fn test_create_under_missing_parent() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let err = DirectoryService::new(&pool, directory_config())
        .create_address(
            &AddressKind::parse("city").unwrap(),
            Some(AddressId::new(i32::MAX)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::AddressNotFound(id) if id.as_i32() == i32::MAX));
}

#[tokio::test]
async fn test_reparenting_rejects_cycles() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let service = DirectoryService::new(&pool, directory_config());

    let country = create(&pool, "country", None).await;
    let region = create(&pool, "region", Some(country.id)).await;
    let city = create(&pool, "city", Some(region.id)).await;

    let err = service.set_parent(country.id, Some(city.id)).await.unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::Hierarchy(HierarchyError::Cycle { .. })
    ));

    let err = service.set_parent(city.id, Some(city.id)).await.unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::Hierarchy(HierarchyError::SelfParent { .. })
    ));

    // Legal moves still work.
    let moved = service.set_parent(city.id, Some(country.id)).await.unwrap();
    assert_eq!(moved.parent_id, Some(country.id));
    let root = service.set_parent(region.id, None).await.unwrap();
    assert_eq!(root.parent_id, None);
}

#[tokio::test]
async fn test_ancestors_and_children() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = AddressRepository::new(&pool);

    let country = create(&pool, "country", None).await;
    let region = create(&pool, "region", Some(country.id)).await;
    let city = create(&pool, "city", Some(region.id)).await;
    let other = create(&pool, "city", Some(region.id)).await;

    let chain: Vec<AddressId> = repo
        .ancestors(city.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.address.id)
        .collect();
    assert_eq!(chain, [city.id, region.id, country.id]);

    let children: Vec<AddressId> = repo
        .children(region.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.address.id)
        .collect();
    assert_eq!(children, [city.id, other.id]);

    assert!(repo.ancestors(AddressId::new(i32::MAX)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_referenced_addresses_cannot_be_deleted() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let service = DirectoryService::new(&pool, directory_config());

    let country = create(&pool, "country", None).await;
    let city = create(&pool, "city", Some(country.id)).await;

    // Has a child
    let err = service.delete_address(country.id).await.unwrap_err();
    assert!(matches!(err, DirectoryError::AddressInUse(_)));

    // Has an item
    let item = ItemRepository::new(&pool, false)
        .create(&ItemName::parse(&unique("museum")).unwrap(), city.id)
        .await
        .unwrap();
    let err = service.delete_address(city.id).await.unwrap_err();
    assert!(matches!(err, DirectoryError::AddressInUse(_)));

    ItemRepository::new(&pool, false).delete(item.id).await.unwrap();
    service.delete_address(city.id).await.unwrap();
    assert!(AddressRepository::new(&pool).get(city.id).await.unwrap().is_none());

    // Has a name
    name(&pool, country.id, "Austria").await;
    let err = service.delete_address(country.id).await.unwrap_err();
    assert!(matches!(err, DirectoryError::AddressInUse(_)));

    let err = service.delete_address(city.id).await.unwrap_err();
    assert!(matches!(err, DirectoryError::AddressNotFound(_)));
}

#[tokio::test]
async fn test_registering_the_same_name_twice_appends() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let region = create(&pool, "region", None).await;
    let town = create(&pool, "town", Some(region.id)).await;
    name(&pool, town.id, "Hallstatt").await;
    let repo = FullNameRepository::new(&pool);

    assert_eq!(
        name(&pool, region.id, "Tyrol").await,
        ["region Tyrol", "region Tyrol town Hallstatt"]
    );
    let first = repo.for_address(region.id).await.unwrap();
    assert_eq!(first.len(), 1);

    assert_eq!(
        name(&pool, region.id, "Tyrol").await,
        ["region Tyrol", "region Tyrol town Hallstatt"]
    );
    let second = repo.for_address(region.id).await.unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].full_name, second[1].full_name);
    assert_ne!(second[0].id, second[1].id);
    assert_eq!(second[0].id, first[0].id);

    // The unchanged town still gains one entry per registration above it.
    assert_eq!(
        full_names(&pool, town.id).await,
        [
            "town Hallstatt",
            "region Tyrol town Hallstatt",
            "region Tyrol town Hallstatt"
        ]
    );
    let names = NameRepository::new(&pool).for_address(region.id).await.unwrap();
    assert_eq!(names.len(), 2);
}
