//! Book repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, filtered listing and status-only updates over `livros`.
//! - Attach the owning category to listed books through a join.
//! - Stamp `data_cadastro` on insert and `data_atualizacao` on every edit.
//!
//! # Invariants
//! - `data_cadastro` is written by `add_book` only; edits never touch it.
//! - `data_atualizacao` strictly increases on each successful edit.
//! - A book never references a missing category after a successful write.
//! - Listing order is `data_cadastro DESC, id DESC`.

use crate::model::book::{Book, BookDraft, BookId, BookWithCategory, ReadingStatus};
use crate::model::category::{Category, CategoryId};
use crate::model::validation::{FieldErrorKind, ValidationErrors};
use crate::model::EpochMillis;
use crate::repo::error::{is_foreign_key_violation, RepoError, RepoResult};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const BOOK_SELECT_SQL: &str = "SELECT
    l.id AS id,
    l.titulo AS titulo,
    l.autor AS autor,
    l.isbn AS isbn,
    l.ano AS ano,
    l.status AS status,
    l.categoria_id AS categoria_id,
    l.data_cadastro AS data_cadastro,
    l.data_atualizacao AS data_atualizacao,
    c.nome AS categoria_nome,
    c.descricao AS categoria_descricao
FROM livros l
INNER JOIN categorias c ON c.id = l.categoria_id";

pub(crate) const BOOK_ORDER_SQL: &str = " ORDER BY l.data_cadastro DESC, l.id DESC";

/// Number of books in the summary's recently-registered list.
pub const RECENT_BOOKS_LIMIT: u32 = 5;

/// Case handling for the free-text book filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    #[default]
    CaseSensitive,
    /// Folds ASCII letters only.
    CaseInsensitive,
}

/// Conjunctive filter for book listing. `None` fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Substring matched against title OR author.
    pub term: Option<String>,
    pub category_id: Option<CategoryId>,
    pub status: Option<ReadingStatus>,
    pub text_match: TextMatch,
    pub limit: Option<u32>,
}

/// How `update_book` treats a record edited since the caller read it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Only require that the book still exists.
    #[default]
    LastWriteWins,
    /// Also require the stored `updated_at` to equal the submitted one.
    Optimistic,
}

/// Dashboard counters plus the most recently registered books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub total_books: u64,
    pub read: u64,
    pub reading: u64,
    pub want_to_read: u64,
    pub total_categories: u64,
    pub recent_books: Vec<BookWithCategory>,
}

/// Repository interface for book operations.
pub trait BookRepository {
    /// Lists books matching `filter`, newest registration first.
    fn list_books(&self, filter: &BookFilter) -> RepoResult<Vec<BookWithCategory>>;
    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>>;
    fn get_book_with_category(&self, id: BookId) -> RepoResult<Option<BookWithCategory>>;
    /// Inserts a book, stamping `registered_at`; rejects unknown categories.
    fn add_book(&self, draft: &BookDraft) -> RepoResult<Book>;
    /// Overwrites editable fields of `book.id`, preserving `registered_at`.
    fn update_book(&self, book: &Book, mode: ConcurrencyMode) -> RepoResult<Book>;
    /// Changes only the status and refreshes `updated_at`.
    fn update_book_status(&self, id: BookId, status: ReadingStatus) -> RepoResult<Book>;
    /// Removes one book; `NotFound` when absent.
    fn delete_book(&self, id: BookId) -> RepoResult<()>;
    /// Counters and recent books read from one snapshot.
    fn catalog_summary(&self) -> RepoResult<CatalogSummary>;
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn list_books(&self, filter: &BookFilter) -> RepoResult<Vec<BookWithCategory>> {
        query_books(self.conn, filter)
    }

    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        Ok(self.get_book_with_category(id)?.map(|entry| entry.book))
    }

    fn get_book_with_category(&self, id: BookId) -> RepoResult<Option<BookWithCategory>> {
        load_book(self.conn, id)
    }

    fn add_book(&self, draft: &BookDraft) -> RepoResult<Book> {
        draft.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_category_reference(&tx, draft.category_id)?;

        let registered_at = now_epoch_ms();
        tx.execute(
            "INSERT INTO livros (
                titulo,
                autor,
                isbn,
                ano,
                status,
                categoria_id,
                data_cadastro,
                data_atualizacao
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL);",
            params![
                draft.title.as_str(),
                draft.author.as_str(),
                draft.isbn.as_deref(),
                draft.year,
                draft.status.to_db(),
                draft.category_id,
                registered_at,
            ],
        )
        .map_err(|err| map_book_write_error(err, draft.category_id))?;

        let id = tx.last_insert_rowid();
        let created = load_book(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted book {id} missing in read-back"))
        })?;
        tx.commit()?;

        Ok(created.book)
    }

    fn update_book(&self, book: &Book, mode: ConcurrencyMode) -> RepoResult<Book> {
        book.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (registered_at, stored_updated_at) =
            load_book_stamps(&tx, book.id)?.ok_or(RepoError::book_not_found(book.id))?;

        if mode == ConcurrencyMode::Optimistic && stored_updated_at != book.updated_at {
            return Err(RepoError::ConcurrencyConflict {
                book_id: book.id,
                expected: book.updated_at,
                actual: stored_updated_at,
            });
        }

        ensure_category_reference(&tx, book.category_id)?;

        let updated_at = next_update_stamp(registered_at, stored_updated_at);
        let changed = tx
            .execute(
                "UPDATE livros
                 SET
                    titulo = ?2,
                    autor = ?3,
                    isbn = ?4,
                    ano = ?5,
                    status = ?6,
                    categoria_id = ?7,
                    data_atualizacao = ?8
                 WHERE id = ?1;",
                params![
                    book.id,
                    book.title.as_str(),
                    book.author.as_str(),
                    book.isbn.as_deref(),
                    book.year,
                    book.status.to_db(),
                    book.category_id,
                    updated_at,
                ],
            )
            .map_err(|err| map_book_write_error(err, book.category_id))?;

        if changed == 0 {
            return Err(RepoError::book_not_found(book.id));
        }

        let updated = load_book(&tx, book.id)?.ok_or(RepoError::book_not_found(book.id))?;
        tx.commit()?;

        Ok(updated.book)
    }

    fn update_book_status(&self, id: BookId, status: ReadingStatus) -> RepoResult<Book> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (registered_at, stored_updated_at) =
            load_book_stamps(&tx, id)?.ok_or(RepoError::book_not_found(id))?;

        let updated_at = next_update_stamp(registered_at, stored_updated_at);
        tx.execute(
            "UPDATE livros
             SET status = ?2,
                 data_atualizacao = ?3
             WHERE id = ?1;",
            params![id, status.to_db(), updated_at],
        )?;

        let updated = load_book(&tx, id)?.ok_or(RepoError::book_not_found(id))?;
        tx.commit()?;

        Ok(updated.book)
    }

    fn delete_book(&self, id: BookId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM livros WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::book_not_found(id));
        }

        Ok(())
    }

    fn catalog_summary(&self) -> RepoResult<CatalogSummary> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;

        let mut summary = CatalogSummary {
            total_books: 0,
            read: 0,
            reading: 0,
            want_to_read: 0,
            total_categories: 0,
            recent_books: Vec::new(),
        };

        {
            let mut stmt = tx.prepare("SELECT status, COUNT(*) FROM livros GROUP BY status;")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let raw_status: i64 = row.get(0)?;
                let count = count_from_db(row.get(1)?);
                match parse_status(raw_status)? {
                    ReadingStatus::WantToRead => summary.want_to_read = count,
                    ReadingStatus::Reading => summary.reading = count,
                    ReadingStatus::Read => summary.read = count,
                }
                summary.total_books += count;
            }
        }

        summary.total_categories =
            count_from_db(tx.query_row("SELECT COUNT(*) FROM categorias;", [], |row| row.get(0))?);
        summary.recent_books = query_books(
            &tx,
            &BookFilter {
                limit: Some(RECENT_BOOKS_LIMIT),
                ..BookFilter::default()
            },
        )?;

        tx.commit()?;
        Ok(summary)
    }
}

fn query_books(conn: &Connection, filter: &BookFilter) -> RepoResult<Vec<BookWithCategory>> {
    let mut sql = format!("{BOOK_SELECT_SQL} WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(term) = filter.term.as_ref() {
        match filter.text_match {
            TextMatch::CaseSensitive => {
                sql.push_str(" AND (instr(l.titulo, ?) > 0 OR instr(l.autor, ?) > 0)");
            }
            TextMatch::CaseInsensitive => sql.push_str(
                " AND (instr(lower(l.titulo), lower(?)) > 0 OR instr(lower(l.autor), lower(?)) > 0)",
            ),
        }
        bind_values.push(Value::Text(term.clone()));
        bind_values.push(Value::Text(term.clone()));
    }

    if let Some(category_id) = filter.category_id {
        sql.push_str(" AND l.categoria_id = ?");
        bind_values.push(Value::Integer(category_id));
    }

    if let Some(status) = filter.status {
        sql.push_str(" AND l.status = ?");
        bind_values.push(Value::Integer(status.to_db()));
    }

    sql.push_str(BOOK_ORDER_SQL);

    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut books = Vec::new();
    while let Some(row) = rows.next()? {
        books.push(parse_book_with_category_row(row)?);
    }

    Ok(books)
}

fn load_book(conn: &Connection, id: BookId) -> RepoResult<Option<BookWithCategory>> {
    let mut stmt = conn.prepare(&format!("{BOOK_SELECT_SQL} WHERE l.id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_book_with_category_row(row)?));
    }

    Ok(None)
}

fn load_book_stamps(
    conn: &Connection,
    id: BookId,
) -> RepoResult<Option<(EpochMillis, Option<EpochMillis>)>> {
    let stamps = conn
        .query_row(
            "SELECT data_cadastro, data_atualizacao FROM livros WHERE id = ?1;",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(stamps)
}

fn ensure_category_reference(conn: &Connection, category_id: CategoryId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categorias WHERE id = ?1);",
        [category_id],
        |row| row.get(0),
    )?;

    if exists == 1 {
        Ok(())
    } else {
        Err(unknown_category())
    }
}

fn unknown_category() -> RepoError {
    RepoError::Validation(ValidationErrors::single(
        "category_id",
        FieldErrorKind::UnknownReference,
    ))
}

fn map_book_write_error(err: rusqlite::Error, category_id: CategoryId) -> RepoError {
    if is_foreign_key_violation(&err) {
        warn!(
            "event=book_write module=repo status=fk_rejected category_id={}",
            category_id
        );
        return unknown_category();
    }
    err.into()
}

/// Parses one row selected with `BOOK_SELECT_SQL` into a bare book.
pub(crate) fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let book = Book {
        id: row.get("id")?,
        title: row.get("titulo")?,
        author: row.get("autor")?,
        isbn: row.get("isbn")?,
        year: row.get("ano")?,
        status: parse_status(row.get("status")?)?,
        category_id: row.get("categoria_id")?,
        registered_at: row.get("data_cadastro")?,
        updated_at: row.get("data_atualizacao")?,
    };
    book.validate().map_err(|err| {
        RepoError::InvalidData(format!("book {} fails validation: {err}", book.id))
    })?;
    Ok(book)
}

fn parse_book_with_category_row(row: &Row<'_>) -> RepoResult<BookWithCategory> {
    let book = parse_book_row(row)?;
    let category = Category {
        id: book.category_id,
        name: row.get("categoria_nome")?,
        description: row.get("categoria_descricao")?,
    };
    Ok(BookWithCategory { book, category })
}

fn parse_status(value: i64) -> RepoResult<ReadingStatus> {
    ReadingStatus::from_db(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{value}` in livros.status"))
    })
}

pub(crate) fn count_from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn now_epoch_ms() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Picks the next `data_atualizacao` value.
///
/// Never earlier than registration and always past the previous stamp, so
/// the stored value doubles as a per-row revision.
fn next_update_stamp(registered_at: EpochMillis, previous: Option<EpochMillis>) -> EpochMillis {
    let floor = match previous {
        Some(previous) => previous.saturating_add(1).max(registered_at),
        None => registered_at,
    };
    now_epoch_ms().max(floor)
}
