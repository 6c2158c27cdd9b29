use car_catalog::logic::catalog::{BrandOps, CarInput, CarOps, CategoryOps, ModelInput, ModelOps};
use car_catalog::model::ModelKey;
use car_catalog::store::traits::{CarStore, CategoryStore, ModelStore, Store};
use car_catalog::{CatalogError, MemoryStore, SortCriteria};

fn model_input(brand: &str, name: &str, year: i32, categories: &[&str]) -> ModelInput {
    ModelInput {
        brand: brand.to_string(),
        name: name.to_string(),
        production_year: year,
        categories: categories.iter().map(|c| c.to_string()).collect(),
    }
}

fn key(brand: &str, name: &str, year: i32) -> ModelKey {
    ModelKey {
        brand: brand.to_string(),
        name: name.to_string(),
        production_year: year,
    }
}

async fn store_with_basics() -> MemoryStore {
    let store = MemoryStore::new();
    BrandOps::create(&store, "Toyota").await.unwrap();
    CategoryOps::create(&store, "Sedan").await.unwrap();
    CategoryOps::create(&store, "Compact").await.unwrap();
    store
}

/// Checks the symmetry invariant for every model/category pair in the store.
async fn assert_links_symmetric<S: Store>(store: &S, model_keys: &[ModelKey], categories: &[&str]) {
    for key in model_keys {
        let model = store.model_by_key(key).await.unwrap().unwrap();
        for name in categories {
            let category = store.category_by_name(name).await.unwrap().unwrap();
            assert_eq!(
                model.categories.contains(&category.id),
                category.models.contains(&model.id),
                "asymmetric link between {:?} and category {name}",
                key
            );
        }
    }
}

#[tokio::test]
async fn creating_a_model_links_its_categories() {
    // Scenario A
    let store = store_with_basics().await;
    let model = ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan"]))
        .await
        .unwrap();

    let sedan = store.category_by_name("Sedan").await.unwrap().unwrap();
    assert!(sedan.models.contains(&model.id));
    assert!(model.categories.contains(&sedan.id));
    assert_links_symmetric(&store, &[key("Toyota", "Corolla", 2020)], &["Sedan", "Compact"]).await;
}

#[tokio::test]
async fn recategorizing_a_model_moves_the_back_references() {
    // Scenario B
    let store = store_with_basics().await;
    let created = ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan"]))
        .await
        .unwrap();

    ModelOps::update(
        &store,
        &key("Toyota", "Corolla", 2020),
        model_input("Toyota", "Corolla", 2020, &["Compact"]),
    )
    .await
    .unwrap();

    let sedan = store.category_by_name("Sedan").await.unwrap().unwrap();
    let compact = store.category_by_name("Compact").await.unwrap().unwrap();
    assert!(!sedan.models.contains(&created.id));
    assert!(compact.models.contains(&created.id));
    assert_links_symmetric(&store, &[key("Toyota", "Corolla", 2020)], &["Sedan", "Compact"]).await;
}

#[tokio::test]
async fn listing_models_by_year_descending_returns_the_top_window() {
    // Scenario C
    let store = store_with_basics().await;
    for (name, year) in [
        ("Avensis", 1999),
        ("Camry", 2005),
        ("Previa", 1991),
        ("Corolla", 2020),
        ("Yaris", 2010),
    ] {
        ModelOps::create(&store, model_input("Toyota", name, year, &[]))
            .await
            .unwrap();
    }

    let page = ModelOps::list(&store, 0, &SortCriteria::new("year", "desc"))
        .await
        .unwrap();
    let years: Vec<i32> = page.iter().map(|m| m.production_year).collect();
    assert_eq!(years, [2020, 2010, 2005]);
}

#[tokio::test]
async fn unknown_car_sort_key_fails_before_any_query() {
    // Scenario D: the store is completely empty, so reaching it would
    // surface NotFound; the sort key must fail first.
    let store = MemoryStore::new();
    let err = CarOps::list(&store, 0, &SortCriteria::new("color", "ASC"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidSortKey(_)));

    let err = ModelOps::list(&store, 0, &SortCriteria::new("", "ASC"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidSortKey(_)));
}

#[tokio::test]
async fn an_empty_page_is_not_found() {
    // Scenario E
    let store = store_with_basics().await;
    let err = BrandOps::list(&store, 10, &SortCriteria::new("none", "ASC"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));

    // Negative pages fall through to an empty window, same outcome.
    let err = BrandOps::list(&store, -1, &SortCriteria::new("none", "ASC"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn direction_defaults_to_ascending_for_anything_but_desc() {
    let store = store_with_basics().await;
    BrandOps::create(&store, "Audi").await.unwrap();

    for direction in ["ASC", "", "sideways", "descending"] {
        let page = BrandOps::list(&store, 0, &SortCriteria::new("none", direction))
            .await
            .unwrap();
        assert_eq!(page[0].name, "Audi", "direction {direction:?}");
    }

    let page = BrandOps::list(&store, 0, &SortCriteria::new("none", "DeSc"))
        .await
        .unwrap();
    assert_eq!(page[0].name, "Toyota");
}

#[tokio::test]
async fn updating_with_a_missing_category_changes_nothing() {
    // P4: no partial relink.
    let store = store_with_basics().await;
    ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan"]))
        .await
        .unwrap();

    let err = ModelOps::update(
        &store,
        &key("Toyota", "Corolla", 2020),
        model_input("Toyota", "Corolla", 2021, &["Hatchback"]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));

    let model = store
        .model_by_key(&key("Toyota", "Corolla", 2020))
        .await
        .unwrap()
        .expect("model fields must be untouched");
    let sedan = store.category_by_name("Sedan").await.unwrap().unwrap();
    assert_eq!(model.categories, [sedan.id].into_iter().collect());
    assert!(sedan.models.contains(&model.id));
}

#[tokio::test]
async fn duplicate_brand_and_category_names_are_rejected() {
    // P5
    let store = store_with_basics().await;

    let err = BrandOps::create(&store, "Toyota").await.unwrap_err();
    let CatalogError::Conflict(message) = err else {
        panic!("expected a conflict");
    };
    assert!(message.contains("Toyota"));

    let err = CategoryOps::create(&store, "Sedan").await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    // The store is unchanged: still exactly one page entry per name.
    let brands = BrandOps::list(&store, 0, &SortCriteria::new("none", "ASC"))
        .await
        .unwrap();
    assert_eq!(brands.len(), 1);
}

#[tokio::test]
async fn update_is_never_upsert() {
    // P6
    let store = store_with_basics().await;

    let err = BrandOps::rename(&store, "Saab", "Spyker").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert!(matches!(
        BrandOps::get(&store, "Spyker").await.unwrap_err(),
        CatalogError::NotFound(_)
    ));

    let err = ModelOps::update(
        &store,
        &key("Toyota", "Celica", 1995),
        model_input("Toyota", "Celica", 1995, &[]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
    assert!(store
        .model_by_key(&key("Toyota", "Celica", 1995))
        .await
        .unwrap()
        .is_none());

    let err = CarOps::renumber(&store, "XX0000", "YY1111").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn model_duplicate_rule_compares_the_category_set_too() {
    let store = store_with_basics().await;
    ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan"]))
        .await
        .unwrap();

    // Identical identity and categories: rejected by the guard.
    let err = ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    // Same identity, different categories: passes the guard, loses against
    // the store's unique constraint at commit time.
    let err = ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Compact"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));
}

#[tokio::test]
async fn car_creation_requires_a_persisted_model() {
    let store = store_with_basics().await;
    let err = CarOps::create(
        &store,
        CarInput {
            number: "AA1234".to_string(),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            production_year: 2020,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_car_numbers_surface_as_conflicts() {
    let store = store_with_basics().await;
    ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan"]))
        .await
        .unwrap();

    let input = CarInput {
        number: "AA1234".to_string(),
        brand: "Toyota".to_string(),
        model: "Corolla".to_string(),
        production_year: 2020,
    };
    CarOps::create(&store, input.clone()).await.unwrap();

    let err = CarOps::create(&store, input).await.unwrap_err();
    let CatalogError::Conflict(message) = err else {
        panic!("expected a conflict");
    };
    assert!(message.contains("AA1234"));
}

#[tokio::test]
async fn renumbering_a_car_keeps_its_model() {
    let store = store_with_basics().await;
    ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &[]))
        .await
        .unwrap();
    CarOps::create(
        &store,
        CarInput {
            number: "AA1234".to_string(),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            production_year: 2020,
        },
    )
    .await
    .unwrap();

    let car = CarOps::renumber(&store, "AA1234", "BB5678").await.unwrap();
    assert_eq!(car.number, "BB5678");
    assert_eq!(car.model.name, "Corolla");
    assert!(store.car_by_number("AA1234").await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_a_model_unlinks_it_everywhere() {
    let store = store_with_basics().await;
    let model = ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan", "Compact"]))
        .await
        .unwrap();
    CarOps::create(
        &store,
        CarInput {
            number: "AA1234".to_string(),
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            production_year: 2020,
        },
    )
    .await
    .unwrap();

    assert_eq!(ModelOps::delete(&store, &key("Toyota", "Corolla", 2020)).await.unwrap(), 1);
    for name in ["Sedan", "Compact"] {
        let category = store.category_by_name(name).await.unwrap().unwrap();
        assert!(!category.models.contains(&model.id));
    }
    assert!(store.car_by_number("AA1234").await.unwrap().is_none());

    // Idempotent-failing: the second delete affects zero rows.
    assert_eq!(ModelOps::delete(&store, &key("Toyota", "Corolla", 2020)).await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_a_category_keeps_its_models() {
    let store = store_with_basics().await;
    ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &["Sedan"]))
        .await
        .unwrap();

    assert_eq!(CategoryOps::delete(&store, "Sedan").await.unwrap(), 1);
    let model = store
        .model_by_key(&key("Toyota", "Corolla", 2020))
        .await
        .unwrap()
        .expect("model must survive category deletion");
    assert!(model.categories.is_empty());
}

#[tokio::test]
async fn validation_runs_before_any_store_interaction() {
    let store = store_with_basics().await;

    let err = ModelOps::create(&store, model_input("Toyota", "C", 1700, &["Sedan"]))
        .await
        .unwrap_err();
    let CatalogError::Validation(message) = err else {
        panic!("expected a validation error");
    };
    assert!(message.contains("modelName"));
    assert!(message.contains("productionYear"));

    // Nothing was written.
    let err = ModelOps::list(&store, 0, &SortCriteria::new("model", "ASC"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn car_listing_sorts_across_the_model_path() {
    let store = store_with_basics().await;
    BrandOps::create(&store, "Audi").await.unwrap();
    ModelOps::create(&store, model_input("Toyota", "Corolla", 2020, &[])).await.unwrap();
    ModelOps::create(&store, model_input("Audi", "A4", 2005, &[])).await.unwrap();

    for (number, brand, model, year) in [
        ("CC0001", "Toyota", "Corolla", 2020),
        ("AA0002", "Audi", "A4", 2005),
    ] {
        CarOps::create(
            &store,
            CarInput {
                number: number.to_string(),
                brand: brand.to_string(),
                model: model.to_string(),
                production_year: year,
            },
        )
        .await
        .unwrap();
    }

    let by_brand = CarOps::list(&store, 0, &SortCriteria::new("brand", "ASC")).await.unwrap();
    let numbers: Vec<&str> = by_brand.iter().map(|c| c.number.as_str()).collect();
    assert_eq!(numbers, ["AA0002", "CC0001"]);

    let by_year_desc = CarOps::list(&store, 0, &SortCriteria::new("year", "DESC")).await.unwrap();
    let numbers: Vec<&str> = by_year_desc.iter().map(|c| c.number.as_str()).collect();
    assert_eq!(numbers, ["CC0001", "AA0002"]);

    let by_number = CarOps::list(&store, 0, &SortCriteria::new("number", "ASC")).await.unwrap();
    assert_eq!(by_number[0].number, "AA0002");
}
