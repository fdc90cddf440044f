use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use storefront_types::access::{
    PasswordHash, Profile, Session, SessionRepository, SessionToken, Shopper, ShopperRepository,
};
use tokio_rusqlite::Connection;
use typesafe_repository::IdentityOf;

pub struct SqliteAccessRepository {
    conn: Connection,
}

impl SqliteAccessRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS shoppers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    picture TEXT,
                    password TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS sessions (
                    token TEXT PRIMARY KEY,
                    shopper_id INTEGER NOT NULL REFERENCES shoppers(id) ON DELETE CASCADE,
                    created_at INTEGER NOT NULL,
                    expires_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS sessions_expires_at ON sessions (expires_at);",
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn shopper_from_row(row: &rusqlite::Row<'_>) -> Result<Shopper, rusqlite::Error> {
    Ok(Shopper {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        picture: row.get(3)?,
    })
}

#[async_trait]
impl ShopperRepository for SqliteAccessRepository {
    async fn credentials(&self, email: &str) -> anyhow::Result<Option<(Shopper, PasswordHash)>> {
        let email = email.to_string();
        Ok(self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name, email, picture, password FROM shoppers WHERE email = ?1",
                        [email],
                        |row| {
                            Ok((
                                shopper_from_row(row)?,
                                PasswordHash::from_encoded(row.get(4)?),
                            ))
                        },
                    )
                    .optional()?)
            })
            .await?)
    }

    async fn register(
        &self,
        profile: Profile,
        password: PasswordHash,
    ) -> anyhow::Result<Option<Shopper>> {
        Ok(self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "INSERT INTO shoppers (name, email, picture, password) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT (email) DO NOTHING
                         RETURNING id, name, email, picture",
                        params![profile.name, profile.email, profile.picture, password.encoded()],
                        shopper_from_row,
                    )
                    .optional()?)
            })
            .await?)
    }

    async fn refresh(&self, id: IdentityOf<Shopper>, profile: Profile) -> anyhow::Result<Shopper> {
        Ok(self
            .conn
            .call(move |conn| {
                Ok(conn.query_row(
                    "UPDATE shoppers SET name = ?2, picture = ?3 WHERE id = ?1
                     RETURNING id, name, email, picture",
                    params![id, profile.name, profile.picture],
                    shopper_from_row,
                )?)
            })
            .await?)
    }
}

#[async_trait]
impl SessionRepository for SqliteAccessRepository {
    async fn add(&self, session: Session) -> anyhow::Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sessions (token, shopper_id, created_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        session.token.0,
                        session.shopper_id,
                        session.created_at,
                        session.expires_at
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn shopper_for(
        &self,
        token: &SessionToken,
        now: i64,
    ) -> anyhow::Result<Option<Shopper>> {
        let token = token.0.clone();
        Ok(self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT sh.id, sh.name, sh.email, sh.picture
                         FROM sessions se
                         JOIN shoppers sh ON se.shopper_id = sh.id
                         WHERE se.token = ?1 AND se.expires_at > ?2",
                        params![token, now],
                        shopper_from_row,
                    )
                    .optional()?)
            })
            .await?)
    }

    async fn remove(&self, token: &SessionToken) -> anyhow::Result<()> {
        let token = token.0.clone();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> anyhow::Result<usize> {
        Ok(self
            .conn
            .call(move |conn| {
                Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?)
            })
            .await?)
    }
}
