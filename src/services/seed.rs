use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::schema;

const BUILTIN_SEED: &str = include_str!("../../seed/seed_data.json");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("cannot read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed seed data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSeed {
    pub username: String,
    pub login: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntrySeed {
    pub amount: f64,
    pub description: String,
    pub user_login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<UserSeed>,
    #[serde(default)]
    pub incomes: Vec<EntrySeed>,
    #[serde(default)]
    pub expenses: Vec<EntrySeed>,
}

impl SeedData {
    pub fn builtin() -> Result<Self, SeedError> {
        Ok(serde_json::from_str(BUILTIN_SEED)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub login: String,
    pub hashed_password: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub amount: f64,
    pub description: String,
    pub user_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    AlreadySeeded,
    Seeded {
        users: usize,
        incomes: usize,
        expenses: usize,
        skipped: usize,
    },
}

#[async_trait]
pub trait SeedStore: Sync {
    type Tx: SeedTx;

    async fn install_schema(&self) -> Result<(), SeedError>;
    async fn begin(&self) -> Result<Self::Tx, SeedError>;
}

// Nothing written through a SeedTx is visible before commit
#[async_trait]
pub trait SeedTx: Send + Sized {
    async fn count_users(&mut self) -> Result<i64, SeedError>;
    // (login, generated id)
    async fn insert_users(&mut self, users: &[NewUser]) -> Result<Vec<(String, i32)>, SeedError>;
    async fn insert_incomes(&mut self, rows: &[NewEntry]) -> Result<(), SeedError>;
    async fn insert_expenses(&mut self, rows: &[NewEntry]) -> Result<(), SeedError>;
    async fn commit(self) -> Result<(), SeedError>;
    async fn rollback(self) -> Result<(), SeedError>;
}

pub async fn seed<S: SeedStore>(
    store: &S,
    data: &SeedData,
    bcrypt_cost: u32,
) -> Result<SeedOutcome, SeedError> {
    store.install_schema().await?;
    let mut tx = store.begin().await?;

    let populated = populate(&mut tx, data, bcrypt_cost).await;
    let result = match populated {
        Ok(SeedOutcome::AlreadySeeded) => {
            info!("Database has already been seeded.");
            tx.rollback().await.map(|_| SeedOutcome::AlreadySeeded)
        }
        Ok(outcome) => tx.commit().await.map(|_| outcome),
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after failed seeding also failed");
            }
            Err(e)
        }
    };

    match &result {
        Ok(SeedOutcome::Seeded { users, incomes, expenses, skipped }) => {
            info!(users, incomes, expenses, skipped, "Database seeding complete.");
        }
        Ok(SeedOutcome::AlreadySeeded) => {}
        Err(e) => error!("Error initializing the database: {}", e),
    }
    result
}

async fn populate<T: SeedTx>(
    tx: &mut T,
    data: &SeedData,
    bcrypt_cost: u32,
) -> Result<SeedOutcome, SeedError> {
    if tx.count_users().await? > 0 {
        return Ok(SeedOutcome::AlreadySeeded);
    }

    info!("Seeding new users...");
    let users = data
        .users
        .iter()
        .map(|user| -> Result<NewUser, SeedError> {
            Ok(NewUser {
                username: user.username.clone(),
                login: user.login.clone(),
                hashed_password: bcrypt::hash(&user.password, bcrypt_cost)?,
                role: user.role.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let login_to_user_id: HashMap<String, i32> = tx.insert_users(&users).await?.into_iter().collect();

    let mut skipped = 0;

    info!("Seeding new incomes...");
    let incomes = resolve_owners("income", &data.incomes, &login_to_user_id, &mut skipped);
    tx.insert_incomes(&incomes).await?;

    info!("Seeding new expenses...");
    let expenses = resolve_owners("expense", &data.expenses, &login_to_user_id, &mut skipped);
    tx.insert_expenses(&expenses).await?;

    Ok(SeedOutcome::Seeded {
        users: users.len(),
        incomes: incomes.len(),
        expenses: expenses.len(),
        skipped,
    })
}

fn resolve_owners(
    kind: &str,
    records: &[EntrySeed],
    login_to_user_id: &HashMap<String, i32>,
    skipped: &mut usize,
) -> Vec<NewEntry> {
    records
        .iter()
        .filter_map(|record| match login_to_user_id.get(&record.user_login) {
            Some(&user_id) => Some(NewEntry {
                amount: record.amount,
                description: record.description.clone(),
                user_id,
            }),
            None => {
                warn!(
                    kind,
                    user_login = %record.user_login,
                    description = %record.description,
                    "skipping seed record for unknown login"
                );
                *skipped += 1;
                None
            }
        })
        .collect()
}

#[async_trait]
impl SeedStore for PgPool {
    type Tx = Transaction<'static, Postgres>;

    async fn install_schema(&self) -> Result<(), SeedError> {
        schema::install(self).await?;
        Ok(())
    }

    async fn begin(&self) -> Result<Self::Tx, SeedError> {
        Ok(PgPool::begin(self).await?)
    }
}

#[async_trait]
impl SeedTx for Transaction<'static, Postgres> {
    async fn count_users(&mut self) -> Result<i64, SeedError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut **self)
            .await?;
        Ok(count)
    }

    async fn insert_users(&mut self, users: &[NewUser]) -> Result<Vec<(String, i32)>, SeedError> {
        if users.is_empty() {
            return Ok(Vec::new());
        }
        let mut qry = QueryBuilder::<Postgres>::new(
            "INSERT INTO users (username, login, hashed_password, role) ",
        );
        qry.push_values(users, |mut row, user| {
            row.push_bind(&user.username)
                .push_bind(&user.login)
                .push_bind(&user.hashed_password)
                .push_bind(&user.role);
        });
        qry.push(" RETURNING login, id");
        let ids: Vec<(String, i32)> = qry.build_query_as().fetch_all(&mut **self).await?;
        Ok(ids)
    }

    async fn insert_incomes(&mut self, rows: &[NewEntry]) -> Result<(), SeedError> {
        insert_entries(self, "incomes", rows).await
    }

    async fn insert_expenses(&mut self, rows: &[NewEntry]) -> Result<(), SeedError> {
        insert_entries(self, "expenses", rows).await
    }

    async fn commit(self) -> Result<(), SeedError> {
        Transaction::commit(self).await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), SeedError> {
        Transaction::rollback(self).await?;
        Ok(())
    }
}

async fn insert_entries(
    tx: &mut Transaction<'static, Postgres>,
    table: &str,
    rows: &[NewEntry],
) -> Result<(), SeedError> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut qry = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {table} (amount, description, user_id) "
    ));
    qry.push_values(rows, |mut row, entry| {
        row.push_bind(entry.amount)
            .push_bind(&entry.description)
            .push_bind(entry.user_id);
    });
    qry.build().execute(&mut **tx).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tables {
        users: Vec<(i32, NewUser)>,
        incomes: Vec<NewEntry>,
        expenses: Vec<NewEntry>,
        next_id: i32,
        commits: usize,
    }

    impl Tables {
        fn insert_checked(&mut self, rows: &[NewEntry], expenses: bool) -> Result<(), SeedError> {
            for row in rows {
                if row.amount <= 0.0 {
                    return Err(sqlx::Error::Protocol("check constraint violated: amount > 0".into()).into());
                }
                if !self.users.iter().any(|(id, _)| *id == row.user_id) {
                    return Err(sqlx::Error::Protocol("foreign key violated: user_id".into()).into());
                }
                if expenses {
                    self.expenses.push(row.clone());
                } else {
                    self.incomes.push(row.clone());
                }
            }
            Ok(())
        }
    }

    // A transaction works on a copy that replaces the shared tables on commit
    #[derive(Default)]
    struct MemoryStore {
        committed: Arc<Mutex<Tables>>,
    }

    struct MemoryTx {
        committed: Arc<Mutex<Tables>>,
        staged: Tables,
    }

    #[async_trait]
    impl SeedStore for MemoryStore {
        type Tx = MemoryTx;

        async fn install_schema(&self) -> Result<(), SeedError> {
            Ok(())
        }

        async fn begin(&self) -> Result<MemoryTx, SeedError> {
            let staged = self.committed.lock().unwrap().clone();
            Ok(MemoryTx {
                committed: self.committed.clone(),
                staged,
            })
        }
    }

    #[async_trait]
    impl SeedTx for MemoryTx {
        async fn count_users(&mut self) -> Result<i64, SeedError> {
            Ok(self.staged.users.len() as i64)
        }

        async fn insert_users(&mut self, users: &[NewUser]) -> Result<Vec<(String, i32)>, SeedError> {
            let mut ids = Vec::new();
            for user in users {
                self.staged.next_id += 1;
                let id = self.staged.next_id;
                self.staged.users.push((id, user.clone()));
                ids.push((user.login.clone(), id));
            }
            Ok(ids)
        }

        async fn insert_incomes(&mut self, rows: &[NewEntry]) -> Result<(), SeedError> {
            self.staged.insert_checked(rows, false)
        }

        async fn insert_expenses(&mut self, rows: &[NewEntry]) -> Result<(), SeedError> {
            self.staged.insert_checked(rows, true)
        }

        async fn commit(mut self) -> Result<(), SeedError> {
            self.staged.commits += 1;
            *self.committed.lock().unwrap() = self.staged;
            Ok(())
        }

        async fn rollback(self) -> Result<(), SeedError> {
            Ok(())
        }
    }

    const TEST_COST: u32 = 4;

    fn user(login: &str) -> UserSeed {
        UserSeed {
            username: login.to_uppercase(),
            login: login.to_string(),
            password: format!("{login}-password"),
            role: "user".to_string(),
        }
    }

    fn entry(login: &str, amount: f64, description: &str) -> EntrySeed {
        EntrySeed {
            amount,
            description: description.to_string(),
            user_login: login.to_string(),
        }
    }

    fn snapshot(store: &MemoryStore) -> Tables {
        store.committed.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn single_income_is_owned_by_its_seeded_user() {
        let store = MemoryStore::default();
        let data = SeedData {
            users: vec![user("alice")],
            incomes: vec![entry("alice", 100.0, "salary")],
            expenses: vec![],
        };

        let outcome = seed(&store, &data, TEST_COST).await.unwrap();
        assert_eq!(
            outcome,
            SeedOutcome::Seeded { users: 1, incomes: 1, expenses: 0, skipped: 0 }
        );

        let tables = snapshot(&store);
        let (alice_id, _) = tables.users.iter().find(|(_, u)| u.login == "alice").unwrap();
        assert_eq!(tables.incomes.len(), 1);
        assert_eq!(tables.incomes[0].user_id, *alice_id);
        assert_eq!(tables.incomes[0].amount, 100.0);
        assert_eq!(tables.incomes[0].description, "salary");
    }

    #[tokio::test]
    async fn passwords_are_stored_as_bcrypt_hashes() {
        let store = MemoryStore::default();
        let data = SeedData {
            users: vec![user("bob")],
            ..Default::default()
        };
        seed(&store, &data, TEST_COST).await.unwrap();

        let tables = snapshot(&store);
        let stored = &tables.users[0].1.hashed_password;
        assert_ne!(stored, "bob-password");
        assert!(bcrypt::verify("bob-password", stored).unwrap());
    }

    #[tokio::test]
    async fn second_run_performs_no_writes() {
        let store = MemoryStore::default();
        let data = SeedData {
            users: vec![user("alice"), user("bob")],
            incomes: vec![entry("alice", 10.0, "gift")],
            expenses: vec![entry("bob", 4.5, "coffee")],
        };
        seed(&store, &data, TEST_COST).await.unwrap();
        let after_first = snapshot(&store);

        let outcome = seed(&store, &data, TEST_COST).await.unwrap();
        assert_eq!(outcome, SeedOutcome::AlreadySeeded);
        assert_eq!(snapshot(&store), after_first);
        assert_eq!(after_first.commits, 1);
    }

    #[tokio::test]
    async fn records_with_unknown_login_are_skipped_and_counted() {
        let store = MemoryStore::default();
        let data = SeedData {
            users: vec![user("alice")],
            incomes: vec![entry("alice", 50.0, "refund"), entry("mallory", 70.0, "???")],
            expenses: vec![entry("nobody", 3.0, "tea"), entry("alice", 9.0, "lunch")],
        };

        let outcome = seed(&store, &data, TEST_COST).await.unwrap();
        assert_eq!(
            outcome,
            SeedOutcome::Seeded { users: 1, incomes: 1, expenses: 1, skipped: 2 }
        );

        let tables = snapshot(&store);
        let alice_id = tables.users[0].0;
        assert!(tables.incomes.iter().chain(&tables.expenses).all(|e| e.user_id == alice_id));
        assert_eq!(tables.incomes[0].description, "refund");
        assert_eq!(tables.expenses[0].description, "lunch");
    }

    #[tokio::test]
    async fn failure_mid_seed_leaves_no_partial_rows() {
        let store = MemoryStore::default();
        let data = SeedData {
            users: vec![user("alice")],
            incomes: vec![entry("alice", 100.0, "salary")],
            expenses: vec![entry("alice", -20.0, "broken row")],
        };

        let err = seed(&store, &data, TEST_COST).await.unwrap_err();
        assert!(matches!(err, SeedError::Database(_)));
        assert_eq!(snapshot(&store), Tables::default());

        // The failed attempt must not count as "already seeded".
        let fixed = SeedData {
            expenses: vec![entry("alice", 20.0, "fixed row")],
            ..data
        };
        let outcome = seed(&store, &fixed, TEST_COST).await.unwrap();
        assert!(matches!(outcome, SeedOutcome::Seeded { users: 1, .. }));
    }

    #[tokio::test]
    async fn invalid_bcrypt_cost_aborts_before_any_write() {
        let store = MemoryStore::default();
        let data = SeedData {
            users: vec![user("alice")],
            ..Default::default()
        };
        let err = seed(&store, &data, 99).await.unwrap_err();
        assert!(matches!(err, SeedError::Hash(_)));
        assert_eq!(snapshot(&store), Tables::default());
    }

    #[test]
    fn builtin_dataset_only_references_seeded_logins() {
        let data = SeedData::builtin().unwrap();
        assert!(!data.users.is_empty());
        let logins: Vec<&str> = data.users.iter().map(|u| u.login.as_str()).collect();
        for record in data.incomes.iter().chain(&data.expenses) {
            assert!(logins.contains(&record.user_login.as_str()), "{}", record.user_login);
            assert!(record.amount > 0.0);
        }
    }

    #[test]
    fn seed_file_errors_are_reported() {
        let err = SeedData::from_file(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(matches!(err, SeedError::Io(_)));
        let err = serde_json::from_str::<SeedData>("{ \"users\": 3 }").map_err(SeedError::from).unwrap_err();
        assert!(matches!(err, SeedError::Json(_)));
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn postgres_seed_links_income_to_generated_user_id(pool: PgPool) {
        let data = SeedData {
            users: vec![user("alice"), user("bob")],
            incomes: vec![entry("alice", 100.0, "salary")],
            expenses: vec![entry("bob", 7.5, "bus"), entry("ghost", 1.0, "nobody")],
        };

        let outcome = seed(&pool, &data, TEST_COST).await.unwrap();
        assert_eq!(
            outcome,
            SeedOutcome::Seeded { users: 2, incomes: 1, expenses: 1, skipped: 1 }
        );

        let alice_id: i32 = sqlx::query_scalar("SELECT id FROM users WHERE login = 'alice'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let rows: Vec<(i32, f64, String)> =
            sqlx::query_as("SELECT user_id, amount, description FROM incomes")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(rows, vec![(alice_id, 100.0, "salary".to_string())]);

        let bob_owns_expense: bool = sqlx::query_scalar(
            "SELECT e.user_id = u.id FROM expenses e JOIN users u ON u.login = 'bob'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(bob_owns_expense);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn postgres_second_seed_writes_nothing(pool: PgPool) {
        let data = SeedData {
            users: vec![user("alice")],
            incomes: vec![entry("alice", 10.0, "gift")],
            expenses: vec![],
        };
        seed(&pool, &data, TEST_COST).await.unwrap();

        let outcome = seed(&pool, &data, TEST_COST).await.unwrap();
        assert_eq!(outcome, SeedOutcome::AlreadySeeded);
        assert_eq!(count(&pool, "users").await, 1);
        assert_eq!(count(&pool, "incomes").await, 1);
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "Requires DATABASE_URL pointing at a PostgreSQL server"]
    async fn postgres_check_violation_rolls_back_every_row(pool: PgPool) {
        let data = SeedData {
            users: vec![user("alice")],
            incomes: vec![entry("alice", 100.0, "salary")],
            expenses: vec![entry("alice", -20.0, "negative")],
        };

        let err = seed(&pool, &data, TEST_COST).await.unwrap_err();
        assert!(matches!(err, SeedError::Database(_)));
        assert_eq!(count(&pool, "users").await, 0);
        assert_eq!(count(&pool, "incomes").await, 0);
        assert_eq!(count(&pool, "expenses").await, 0);
    }
}
