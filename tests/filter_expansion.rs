use metacat::catalog::types::{IMAGE_OBJECT_TYPE, MACHINE_OBJECT_TYPE, PROVIDER_OBJECT_TYPE};
use metacat::filter::{expand_object_filter, normalize_object_filters};
use metacat::{
    MemoryKv, MetaConfig, Object, ObjectFilter, PropertyCondition, SearchTerm, Session, Store,
};
use std::sync::Arc;

struct Fixture {
    store: Store,
    session: Session,
    dev: Vec<String>,
}

async fn fixture() -> Fixture {
    let store = Store::open(Arc::new(MemoryKv::new()), MetaConfig::default())
        .await
        .expect("open");
    let mut dev = Vec::new();
    for name in ["dev-east", "dev-west", "dev-central"] {
        dev.push(store.create_partition(name, None).await.expect(name).uuid);
    }
    let prod = store.create_partition("prod", None).await.expect("prod").uuid;
    for partition in dev.iter().chain([&prod]) {
        store
            .create_object(Object::new(partition.clone(), PROVIDER_OBJECT_TYPE, "shared"))
            .await
            .expect("provider");
        store
            .create_object(
                Object::new(partition.clone(), MACHINE_OBJECT_TYPE, "box")
                    .with_project("proj-a")
                    .with_property("tier", "gold"),
            )
            .await
            .expect("machine");
    }
    Fixture {
        store,
        session: Session::new("alice", "proj-a", prod),
        dev,
    }
}

#[tokio::test]
async fn partition_prefix_expands_to_every_match() {
    let fx = fixture().await;
    let filter = ObjectFilter::new()
        .partition(SearchTerm::prefix("dev"))
        .object_type(SearchTerm::exact(PROVIDER_OBJECT_TYPE));
    let conditions = expand_object_filter(&fx.store, &filter, &fx.session)
        .await
        .expect("expand");
    assert_eq!(conditions.len(), 3);
    for condition in &conditions {
        let partition = condition.exact_partition().expect("concrete partition");
        assert!(fx.dev.iter().any(|p| p == partition));
        assert_eq!(condition.exact_type(), Some(PROVIDER_OBJECT_TYPE));
        assert_eq!(condition.exact_project(), Some("proj-a"));
    }

    let found = fx.store.list_objects(&conditions).await.expect("list");
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|o| fx.dev.contains(&o.partition)));
}

#[tokio::test]
async fn partition_prefix_without_type_leaves_type_open() {
    let fx = fixture().await;
    let filter = ObjectFilter::new().partition(SearchTerm::prefix("dev"));
    let conditions = expand_object_filter(&fx.store, &filter, &fx.session)
        .await
        .expect("expand");
    assert_eq!(conditions.len(), 3);
    assert!(conditions.iter().all(|c| c.exact_type().is_none()));
    let found = fx.store.list_objects(&conditions).await.expect("list");
    assert_eq!(found.len(), 6);
}

#[tokio::test]
async fn unresolvable_terms_match_nothing() {
    let fx = fixture().await;
    let no_partition = ObjectFilter::new().partition(SearchTerm::exact("staging"));
    assert!(
        expand_object_filter(&fx.store, &no_partition, &fx.session)
            .await
            .expect("expand")
            .is_empty()
    );
    let no_type = ObjectFilter::new().object_type(SearchTerm::prefix("space"));
    assert!(
        expand_object_filter(&fx.store, &no_type, &fx.session)
            .await
            .expect("expand")
            .is_empty()
    );
}

#[tokio::test]
async fn type_prefix_crosses_with_partitions() {
    let fx = fixture().await;
    let filters = [
        ObjectFilter::new()
            .partition(SearchTerm::prefix("dev-"))
            .object_type(SearchTerm::prefix("ma")),
        ObjectFilter::new().object_type(SearchTerm::exact(IMAGE_OBJECT_TYPE)),
    ];
    let conditions = normalize_object_filters(&fx.store, &filters, &fx.session)
        .await
        .expect("normalize");
    assert_eq!(conditions.len(), 4);
    let machines = fx.store.list_objects(&conditions).await.expect("list");
    assert_eq!(machines.len(), 3);
    assert!(machines.iter().all(|o| o.object_type == MACHINE_OBJECT_TYPE));
}

#[tokio::test]
async fn empty_filter_list_is_confined_to_the_session() {
    let fx = fixture().await;
    let conditions = normalize_object_filters(&fx.store, &[], &fx.session)
        .await
        .expect("normalize");
    assert_eq!(conditions.len(), 1);
    let found = fx.store.list_objects(&conditions).await.expect("list");
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|o| o.partition == fx.session.partition));
}

#[tokio::test]
async fn name_and_property_terms_narrow_the_result() {
    let fx = fixture().await;
    let by_name = ObjectFilter::new()
        .partition(SearchTerm::prefix("dev"))
        .object_type(SearchTerm::exact(MACHINE_OBJECT_TYPE))
        .uuid_or_name(SearchTerm::prefix("bo"));
    let conditions = normalize_object_filters(&fx.store, &[by_name], &fx.session)
        .await
        .expect("normalize");
    assert_eq!(fx.store.list_objects(&conditions).await.expect("names").len(), 3);

    let silver = ObjectFilter::new()
        .partition(SearchTerm::prefix("dev"))
        .properties(PropertyCondition::new().require_item("tier", "silver"));
    let conditions = normalize_object_filters(&fx.store, &[silver], &fx.session)
        .await
        .expect("normalize");
    assert!(fx.store.list_objects(&conditions).await.expect("props").is_empty());

    let machine = fx
        .store
        .get_object_by_name(&fx.dev[0], MACHINE_OBJECT_TYPE, Some("proj-a"), "box")
        .await
        .expect("machine");
    let by_uuid = ObjectFilter::new()
        .partition(SearchTerm::prefix("dev"))
        .uuid_or_name(SearchTerm::exact(machine.uuid.to_uppercase()));
    let conditions = normalize_object_filters(&fx.store, &[by_uuid], &fx.session)
        .await
        .expect("normalize");
    let found = fx.store.list_objects(&conditions).await.expect("uuid");
    assert_eq!(found, vec![machine]);
}
