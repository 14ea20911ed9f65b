//! Category repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `categorias`.
//! - Answer the derived category -> books relation by query.
//! - Enforce restrict-on-delete before SQLite's own foreign key does.
//!
//! # Invariants
//! - Listing order is insertion order (`id ASC`).
//! - A category referenced by any book is never removed.

use crate::model::book::Book;
use crate::model::category::{Category, CategoryDraft, CategoryId, CategoryWithBooks};
use crate::repo::book_repo::{count_from_db, parse_book_row, BOOK_ORDER_SQL, BOOK_SELECT_SQL};
use crate::repo::error::{is_foreign_key_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;

const CATEGORY_SELECT_SQL: &str = "SELECT id, nome, descricao FROM categorias";

/// Repository interface for category operations.
pub trait CategoryRepository {
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    /// Lists categories with their referencing books eagerly attached.
    fn list_categories_with_books(&self) -> RepoResult<Vec<CategoryWithBooks>>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn add_category(&self, draft: &CategoryDraft) -> RepoResult<Category>;
    /// Overwrites name/description; `NotFound` when the row is gone.
    fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> RepoResult<Category>;
    /// Removes one category; `ReferentialConflict` while books reference it.
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;
    fn count_books_in_category(&self, id: CategoryId) -> RepoResult<u64>;
    /// Books whose category is `id`, newest registration first.
    fn books_in_category(&self, id: CategoryId) -> RepoResult<Vec<Book>>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        query_categories(self.conn)
    }

    fn list_categories_with_books(&self) -> RepoResult<Vec<CategoryWithBooks>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let categories = query_categories(&tx)?;

        let mut books_by_category: HashMap<CategoryId, Vec<Book>> = HashMap::new();
        {
            let mut stmt = tx.prepare(&format!("{BOOK_SELECT_SQL}{BOOK_ORDER_SQL};"))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let book = parse_book_row(row)?;
                books_by_category
                    .entry(book.category_id)
                    .or_default()
                    .push(book);
            }
        }
        tx.commit()?;

        Ok(categories
            .into_iter()
            .map(|category| {
                let books = books_by_category.remove(&category.id).unwrap_or_default();
                CategoryWithBooks { category, books }
            })
            .collect())
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        load_category(self.conn, id)
    }

    fn add_category(&self, draft: &CategoryDraft) -> RepoResult<Category> {
        draft.validate()?;

        self.conn.execute(
            "INSERT INTO categorias (nome, descricao) VALUES (?1, ?2);",
            params![draft.name.as_str(), draft.description.as_deref()],
        )?;

        Ok(Category {
            id: self.conn.last_insert_rowid(),
            name: draft.name.clone(),
            description: draft.description.clone(),
        })
    }

    fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> RepoResult<Category> {
        draft.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE categorias
             SET nome = ?2,
                 descricao = ?3
             WHERE id = ?1;",
            params![id, draft.name.as_str(), draft.description.as_deref()],
        )?;

        if changed == 0 {
            return Err(RepoError::category_not_found(id));
        }

        let updated = load_category(&tx, id)?.ok_or(RepoError::category_not_found(id))?;
        tx.commit()?;

        Ok(updated)
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_category(&tx, id)?.is_none() {
            return Err(RepoError::category_not_found(id));
        }

        let book_count = count_books(&tx, id)?;
        if book_count > 0 {
            return Err(RepoError::ReferentialConflict {
                category_id: id,
                book_count,
            });
        }

        match tx.execute("DELETE FROM categorias WHERE id = ?1;", [id]) {
            Ok(_) => {}
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(RepoError::ReferentialConflict {
                    category_id: id,
                    book_count: count_books(&tx, id)?,
                });
            }
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;

        Ok(())
    }

    fn count_books_in_category(&self, id: CategoryId) -> RepoResult<u64> {
        count_books(self.conn, id)
    }

    fn books_in_category(&self, id: CategoryId) -> RepoResult<Vec<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL} WHERE l.categoria_id = ?1{BOOK_ORDER_SQL};"
        ))?;
        let mut rows = stmt.query([id])?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }
        Ok(books)
    }
}

fn query_categories(conn: &Connection) -> RepoResult<Vec<Category>> {
    let mut stmt = conn.prepare(&format!("{CATEGORY_SELECT_SQL} ORDER BY id ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut categories = Vec::new();
    while let Some(row) = rows.next()? {
        categories.push(parse_category_row(row)?);
    }
    Ok(categories)
}

fn load_category(conn: &Connection, id: CategoryId) -> RepoResult<Option<Category>> {
    let mut stmt = conn.prepare(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_category_row(row)?));
    }
    Ok(None)
}

fn count_books(conn: &Connection, id: CategoryId) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM livros WHERE categoria_id = ?1;",
        [id],
        |row| row.get(0),
    )?;
    Ok(count_from_db(count))
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("nome")?,
        description: row.get("descricao")?,
    })
}
