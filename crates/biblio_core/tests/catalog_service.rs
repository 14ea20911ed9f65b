use biblio_core::db::open_db_in_memory;
use biblio_core::{
    BookDraft, BookQuery, CatalogError, CategoryDraft, ConcurrencyMode, Entity, ReadingStatus,
    SqliteCatalogService, TextMatch,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn sci_fi_lifecycle_scenario() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);

    let sci_fi = service
        .create_category(CategoryDraft::new("Sci-Fi", None))
        .unwrap();
    assert_eq!(sci_fi.id, 6);

    let dune = service
        .create_book(BookDraft::new("Dune", "Herbert", sci_fi.id))
        .unwrap();
    assert_eq!(dune.status, ReadingStatus::WantToRead);
    assert!(dune.registered_at > 0);
    assert_eq!(dune.updated_at, None);

    let reading = service
        .set_book_status(dune.id, ReadingStatus::Reading)
        .unwrap();
    assert_eq!(reading.status.as_str(), "Reading");
    assert!(reading.updated_at.is_some());

    let err = service.delete_category(sci_fi.id).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::ReferentialConflict {
            category_id: 6,
            book_count: 1
        }
    ));
    assert!(err.is_expected());
    assert_eq!(service.category_books(sci_fi.id).unwrap().len(), 1);

    service.delete_book(dune.id).unwrap();
    service.delete_category(sci_fi.id).unwrap();
    assert!(matches!(
        service.get_category(sci_fi.id).unwrap_err(),
        CatalogError::NotFound {
            entity: Entity::Category,
            id: 6
        }
    ));
}

#[test]
fn editing_a_missing_book_is_not_found_and_leaves_state_unchanged() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);
    let kept = service
        .create_book(BookDraft::new("Dune", "Herbert", 1))
        .unwrap();

    let mut ghost = kept.clone();
    ghost.id = kept.id + 100;
    ghost.title = "Ghost".to_string();
    let err = service
        .edit_book(ghost, ConcurrencyMode::LastWriteWins)
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::NotFound {
            entity: Entity::Book,
            ..
        }
    ));

    let all = service.list_books(&BookQuery::default()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].book, kept);
}

#[test]
fn creating_a_book_in_a_missing_category_persists_nothing() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);

    let err = service
        .create_book(BookDraft::new("Dune", "Herbert", 12))
        .unwrap_err();
    match err {
        CatalogError::Validation(errors) => assert!(errors.has_field("category_id")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.list_books(&BookQuery::default()).unwrap().is_empty());
}

#[test]
fn edit_book_keeps_registration_even_when_caller_changes_it() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);
    let book = service
        .create_book(BookDraft::new("Dune", "Herbert", 1))
        .unwrap();

    let mut edited = book.clone();
    edited.author = "  Frank Herbert ".to_string();
    edited.registered_at = book.registered_at + 86_400_000;
    edited.updated_at = Some(0);
    let saved = service
        .edit_book(edited, ConcurrencyMode::LastWriteWins)
        .unwrap();

    assert_eq!(saved.author, "Frank Herbert");
    assert_eq!(saved.registered_at, book.registered_at);
    assert!(saved.updated_at.unwrap() >= book.registered_at);
}

#[test]
fn optimistic_edit_surfaces_concurrency_conflict() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);
    let snapshot = service
        .create_book(BookDraft::new("Dune", "Herbert", 1))
        .unwrap();

    service
        .set_book_status(snapshot.id, ReadingStatus::Read)
        .unwrap();

    let mut stale = snapshot.clone();
    stale.title = "Dune (annotated)".to_string();
    let err = service
        .edit_book(stale, ConcurrencyMode::Optimistic)
        .unwrap_err();
    assert!(matches!(err, CatalogError::ConcurrencyConflict { .. }));
    assert!(err.is_expected());

    let fresh = service.get_book(snapshot.id).unwrap();
    assert_eq!(fresh.title, "Dune");
    let mut retry = fresh.clone();
    retry.title = "Dune (annotated)".to_string();
    let saved = service
        .edit_book(retry, ConcurrencyMode::Optimistic)
        .unwrap();
    assert_eq!(saved.title, "Dune (annotated)");
    assert_eq!(saved.status, ReadingStatus::Read);
}

#[test]
fn deletes_differ_between_books_and_categories() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);

    service.delete_book(12345).unwrap();

    let err = service.delete_category(12345).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::NotFound {
            entity: Entity::Category,
            id: 12345
        }
    ));
}

#[test]
fn deleting_last_book_never_cascades_to_its_category() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);
    let book = service
        .create_book(BookDraft::new("Walden", "Thoreau", 2))
        .unwrap();

    service.delete_book(book.id).unwrap();
    assert_eq!(service.get_category(2).unwrap().name, "Non-Fiction");
    assert_eq!(service.list_categories().unwrap().len(), 5);
}

#[test]
fn category_validation_reports_every_field() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);

    let err = service
        .create_category(CategoryDraft::new("   ", Some("d".repeat(501))))
        .unwrap_err();
    match err {
        CatalogError::Validation(errors) => {
            assert!(errors.has_field("name"));
            assert!(errors.has_field("description"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn edit_category_normalizes_and_reports_missing_rows() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);

    let edited = service
        .edit_category(5, CategoryDraft::new(" Self Improvement ", Some(String::new())))
        .unwrap();
    assert_eq!(edited.name, "Self Improvement");
    assert_eq!(edited.description, None);

    let err = service
        .edit_category(77, CategoryDraft::new("Nope", None))
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { id: 77, .. }));
}

#[test]
fn list_books_composes_optional_filters() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);
    let dune = service
        .create_book(BookDraft::new("Dune", "Herbert", 1))
        .unwrap();
    let walden = service
        .create_book(BookDraft::new("Walden", "Thoreau", 2))
        .unwrap();
    service
        .set_book_status(walden.id, ReadingStatus::Reading)
        .unwrap();

    let blank_term = BookQuery {
        term: Some("   ".to_string()),
        ..BookQuery::default()
    };
    let ids: Vec<_> = service
        .list_books(&blank_term)
        .unwrap()
        .into_iter()
        .map(|entry| entry.book.id)
        .collect();
    assert_eq!(ids, vec![walden.id, dune.id]);

    let by_category = BookQuery {
        category_id: Some(1),
        ..BookQuery::default()
    };
    let found = service.list_books(&by_category).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].book.id, dune.id);
    assert_eq!(found[0].category.name, "Fiction");

    let by_status = BookQuery {
        status: Some(ReadingStatus::Reading),
        ..BookQuery::default()
    };
    let found = service.list_books(&by_status).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].book.id, walden.id);
}

#[test]
fn case_insensitive_search_is_configurable() {
    let conn = setup();
    let service =
        SqliteCatalogService::from_connection(&conn).with_text_match(TextMatch::CaseInsensitive);
    service
        .create_book(BookDraft::new("Dune", "Frank Herbert", 1))
        .unwrap();

    let query = BookQuery {
        term: Some("HERBERT".to_string()),
        ..BookQuery::default()
    };
    assert_eq!(service.list_books(&query).unwrap().len(), 1);
}

#[test]
fn catalog_summary_counts_statuses_and_lists_recent_books() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);

    let mut created = Vec::new();
    for (index, status) in [
        ReadingStatus::Read,
        ReadingStatus::Read,
        ReadingStatus::Reading,
        ReadingStatus::WantToRead,
        ReadingStatus::WantToRead,
        ReadingStatus::WantToRead,
    ]
    .into_iter()
    .enumerate()
    {
        let mut draft = BookDraft::new(format!("Book {index}"), "Author", 1 + index as i64 % 5);
        draft.status = status;
        created.push(service.create_book(draft).unwrap());
    }

    let summary = service.catalog_summary().unwrap();
    assert_eq!(summary.total_books, 6);
    assert_eq!(summary.read, 2);
    assert_eq!(summary.reading, 1);
    assert_eq!(summary.want_to_read, 3);
    assert_eq!(summary.total_categories, 5);

    let recent: Vec<_> = summary
        .recent_books
        .iter()
        .map(|entry| entry.book.id)
        .collect();
    let expected: Vec<_> = created.iter().rev().take(5).map(|book| book.id).collect();
    assert_eq!(recent, expected);
}

#[test]
fn book_details_attach_category() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);
    let book = service
        .create_book(BookDraft::new("SICP", "Abelson", 3))
        .unwrap();

    let details = service.book_details(book.id).unwrap();
    assert_eq!(details.book, book);
    assert_eq!(details.category.name, "Technology");

    assert!(matches!(
        service.book_details(book.id + 1).unwrap_err(),
        CatalogError::NotFound {
            entity: Entity::Book,
            ..
        }
    ));
}

#[test]
fn eager_category_listing_attaches_books() {
    let conn = setup();
    let service = SqliteCatalogService::from_connection(&conn);
    let book = service
        .create_book(BookDraft::new("Steve Jobs", "Isaacson", 4))
        .unwrap();

    let listing = service.list_categories_with_books().unwrap();
    let biographies = listing
        .iter()
        .find(|entry| entry.category.id == 4)
        .unwrap();
    assert_eq!(biographies.books, vec![book]);
    assert!(listing
        .iter()
        .filter(|entry| entry.category.id != 4)
        .all(|entry| entry.books.is_empty()));
}
