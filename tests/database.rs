#![cfg(feature = "database")]

mod support;

use std::sync::Arc;

use active_record_rs::{
    Criteria, DatabaseStorage, Model, ModelError, ModelRepository, ModelsExt, Record,
    SessionStorage, StorageManager,
};
use serde_json::{json, Value};
use support::models::{Person, Post, Writer};

fn blog() -> Arc<DatabaseStorage> {
    support::init_tracing();
    let db = DatabaseStorage::open_in_memory().unwrap();
    db.execute_batch(
        "create table posts (id integer primary key autoincrement, label text);
         create table authors (author_id integer primary key autoincrement, name text);",
    )
    .unwrap();
    Arc::new(db)
}

#[test]
fn first_post_is_saved_with_identifier_one() {
    let posts = blog().models::<Post>();

    let mut post = posts.new_record();
    post.set("label", "x").unwrap();
    let id = posts.save(&mut post).unwrap();
    assert_eq!(id, json!(1));
    assert_eq!(post.id(), Some(&json!(1)));

    let found = posts.find(1).unwrap().unwrap();
    assert_eq!(found.get("label"), Some(&json!("x")));
    assert_eq!(found, post);
}

#[test]
fn typed_models_round_trip_through_records() {
    let posts = blog().models::<Post>();

    let mut record = Record::from_model(&Post::new("typed")).unwrap();
    posts.save(&mut record).unwrap();

    let loaded: Post = posts.find(1).unwrap().unwrap().decode().unwrap();
    assert_eq!(
        loaded,
        Post {
            id: Some(1),
            ..Post::new("typed")
        }
    );
}

#[test]
fn transient_fields_are_not_persisted() {
    let posts = blog().models::<Post>();

    let mut post = posts.new_record();
    post.set("label", "x").unwrap();
    post.set("preview", "x...").unwrap();
    posts.save(&mut post).unwrap();

    let found = posts.find(1).unwrap().unwrap();
    assert_eq!(found.get("preview"), None);
}

#[test]
fn saving_twice_keeps_the_identifier() {
    let posts = blog().models::<Post>();

    let mut post = posts.new_record();
    post.set("label", "x").unwrap();
    let first = posts.save(&mut post).unwrap();
    let second = posts.save(&mut post).unwrap();
    assert_eq!(first, second);
    assert_eq!(posts.all().unwrap().len(), 1);
}

#[test]
fn updates_write_changed_fields() {
    let posts = blog().models::<Post>();

    let mut post = posts.new_record();
    post.set("label", "draft").unwrap();
    let id = posts.save(&mut post).unwrap();

    post.set("label", "final").unwrap();
    assert_eq!(posts.save(&mut post).unwrap(), id);

    let found = posts.find(id).unwrap().unwrap();
    assert_eq!(found.get("label"), Some(&json!("final")));
}

#[test]
fn find_by_matches_every_filter() {
    let posts = blog().models::<Post>();
    for label in ["a", "b", "a"] {
        posts
            .create(json!({ "label": label }).as_object().cloned().unwrap(), true)
            .unwrap();
    }

    let matches = posts.find_by(&Criteria::new().with("label", "a")).unwrap();
    assert_eq!(matches.ids(), vec![json!(1), json!(3)]);

    let none = posts
        .find_by(&Criteria::new().with("label", "a").with("id", 2))
        .unwrap();
    assert!(none.is_empty());

    assert_eq!(posts.all().unwrap().len(), 3);

    let first = posts
        .find_one_by(&Criteria::new().with("label", "b"))
        .unwrap()
        .unwrap();
    assert_eq!(first.id(), Some(&json!(2)));
    assert!(posts
        .find_one_by(&Criteria::new().with("label", "z"))
        .unwrap()
        .is_none());
}

#[test]
fn callbacks_see_records_in_result_order() {
    let posts = blog().models::<Post>();
    for label in ["a", "b", "c"] {
        posts
            .create(json!({ "label": label }).as_object().cloned().unwrap(), true)
            .unwrap();
    }

    let labels = posts
        .all_with(|post| post.get("label").cloned().unwrap_or_default())
        .unwrap();
    assert_eq!(labels, vec![json!("a"), json!("b"), json!("c")]);
}

#[test]
fn callbacks_may_query_the_same_storage() {
    let posts = blog().models::<Post>();
    for label in ["a", "b"] {
        posts
            .create(json!({ "label": label }).as_object().cloned().unwrap(), true)
            .unwrap();
    }

    let reloaded = posts
        .all_with(|post| {
            let id = post.id().cloned().unwrap_or_default();
            posts.find(id).unwrap().is_some()
        })
        .unwrap();
    assert_eq!(reloaded, vec![true, true]);
}

#[test]
fn find_one_by_stops_reading_after_the_first_row() {
    support::init_tracing();
    let db = DatabaseStorage::open_in_memory().unwrap();
    // The second row of the view fails to evaluate.
    db.execute_batch(
        "create table raw_posts (id integer primary key, label text);
         insert into raw_posts (label) values ('first'), ('second');
         create view posts as
             select id, case when id = 1 then label else json('{broken') end as label
             from raw_posts;",
    )
    .unwrap();
    let posts = Arc::new(db).models::<Post>();

    let first = posts.find_one_by(&Criteria::new()).unwrap().unwrap();
    assert_eq!(first.get("label"), Some(&json!("first")));
    assert!(matches!(posts.all().unwrap_err(), ModelError::Database(_)));
}

fn count(repo: &ModelRepository, criteria: Criteria) -> usize {
    repo.find_by(&criteria).unwrap().len()
}

#[test]
fn filters_agree_with_the_session_backend() {
    let db = blog();
    db.execute_batch(
        "create table persons (id integer primary key, first_name text, last_name text)",
    )
    .unwrap();
    let session = Arc::new(SessionStorage::new());

    for posts in [db.models::<Post>(), session.models::<Post>()] {
        posts
            .create(json!({ "label": "1" }).as_object().cloned().unwrap(), true)
            .unwrap();
        assert_eq!(count(&posts, Criteria::new().with("label", 1)), 0);
        assert_eq!(count(&posts, Criteria::new().with("label", 1.0)), 0);
        assert_eq!(count(&posts, Criteria::new().with("label", "1")), 1);
    }

    for people in [db.models::<Person>(), session.models::<Person>()] {
        let mut person = people.new_record();
        person.set("first_name", "Alex").unwrap();
        people.save(&mut person).unwrap();

        assert_eq!(person.get("last_name"), Some(&Value::Null));
        assert_eq!(count(&people, Criteria::new().with("last_name", Value::Null)), 1);
        assert_eq!(count(&people, Criteria::new().with("last_name", "")), 0);
        let found = people.find(person.id().cloned().unwrap()).unwrap().unwrap();
        assert_eq!(found, person);
    }
}

#[test]
fn saving_a_deleted_record_writes_nothing() {
    let posts = blog().models::<Post>();
    let mut post = posts
        .create(json!({ "label": "x" }).as_object().cloned().unwrap(), true)
        .unwrap();
    assert!(posts.delete(&post).unwrap());

    post.set("label", "y").unwrap();
    assert_eq!(posts.save(&mut post).unwrap(), json!(1));
    assert!(posts.find(1).unwrap().is_none());
    assert!(posts.all().unwrap().is_empty());
}

#[test]
fn unknown_filter_field_is_a_database_error() {
    let posts = blog().models::<Post>();
    let err = posts
        .find_by(&Criteria::new().with("missing_column", 1))
        .unwrap_err();
    assert!(matches!(err, ModelError::Database(_)));
}

#[test]
fn delete_removes_the_row() {
    let posts = blog().models::<Post>();

    let mut post = posts.new_record();
    post.set("label", "x").unwrap();
    let id = posts.save(&mut post).unwrap();

    assert!(posts.delete(&post).unwrap());
    assert!(posts.find(id).unwrap().is_none());
    assert!(!posts.delete(&post).unwrap());
}

#[test]
fn delete_of_unsaved_record_succeeds() {
    let posts = blog().models::<Post>();
    assert!(posts.delete(&posts.new_record()).unwrap());
    assert!(posts.all().unwrap().is_empty());
}

#[test]
fn custom_identifier_field_and_type_name() {
    let storage = blog();
    let authors = storage.models::<Writer>();
    assert_eq!(Writer::model_type().name(), "Author");
    assert_eq!(Writer::model_type().id_field(), "author_id");

    let mut author = authors.new_record();
    author.set("name", "Ada").unwrap();
    let id = authors.save(&mut author).unwrap();

    let found = authors.find(id).unwrap().unwrap();
    let writer: Writer = found.decode().unwrap();
    assert_eq!(writer.author_id, Some(1));
    assert_eq!(writer.name, "Ada");
}

#[test]
fn unconfigured_database_is_a_configuration_error() {
    let mut manager = StorageManager::new();
    manager.attach::<Post>(Arc::new(DatabaseStorage::new()));

    let err = manager.models::<Post>().find(1).unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));
}

#[test]
fn lazy_collection_resolves_on_read() {
    let posts = blog().models::<Post>();
    for n in 1..=9 {
        posts
            .create(json!({ "label": format!("post {}", n) }).as_object().cloned().unwrap(), true)
            .unwrap();
    }

    let mut lazy = posts.lazy_from_ids([5, 7, 9]).unwrap();
    let second = lazy.get(1).unwrap().unwrap();
    assert_eq!(second.id(), Some(&json!(7)));
    assert!(!lazy.is_resolved(0));
    assert!(lazy.is_resolved(1));
    assert!(!lazy.is_resolved(2));

    lazy.preload(0, 2).unwrap();
    assert!((0..3).all(|i| lazy.is_resolved(i)));
    assert_eq!(lazy.to_string(), "Post[3]{ 5, 7, 9 }");
}
