//! Actor repository contract and SQLite implementation.

use crate::model::actor::{Actor, ActorId, Role};
use crate::repo::{invalid_column, parse_uuid, RepoResult, SqliteStore};
use rusqlite::{params, OptionalExtension, Row};

const ACTOR_SELECT_SQL: &str = "SELECT id, username, role FROM actors";

/// Repository interface for actor identities.
pub trait ActorRepository {
    fn create_actor(&self, actor: &Actor) -> RepoResult<ActorId>;
    fn get_actor(&self, id: ActorId) -> RepoResult<Option<Actor>>;
    fn find_actor_by_username(&self, username: &str) -> RepoResult<Option<Actor>>;
}

impl<T: ActorRepository + ?Sized> ActorRepository for &T {
    fn create_actor(&self, actor: &Actor) -> RepoResult<ActorId> {
        (**self).create_actor(actor)
    }

    fn get_actor(&self, id: ActorId) -> RepoResult<Option<Actor>> {
        (**self).get_actor(id)
    }

    fn find_actor_by_username(&self, username: &str) -> RepoResult<Option<Actor>> {
        (**self).find_actor_by_username(username)
    }
}

impl ActorRepository for SqliteStore<'_> {
    fn create_actor(&self, actor: &Actor) -> RepoResult<ActorId> {
        self.conn().execute(
            "INSERT INTO actors (id, username, role) VALUES (?1, ?2, ?3);",
            params![
                actor.id.to_string(),
                actor.username.as_str(),
                actor.role.as_str()
            ],
        )?;
        Ok(actor.id)
    }

    fn get_actor(&self, id: ActorId) -> RepoResult<Option<Actor>> {
        self.conn()
            .query_row(
                &format!("{ACTOR_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_actor_columns,
            )
            .optional()?
            .map(parse_actor)
            .transpose()
    }

    fn find_actor_by_username(&self, username: &str) -> RepoResult<Option<Actor>> {
        self.conn()
            .query_row(
                &format!("{ACTOR_SELECT_SQL} WHERE username = ?1;"),
                [username.trim()],
                read_actor_columns,
            )
            .optional()?
            .map(parse_actor)
            .transpose()
    }
}

type ActorColumns = (String, String, String);

fn read_actor_columns(row: &Row<'_>) -> rusqlite::Result<ActorColumns> {
    Ok((row.get("id")?, row.get("username")?, row.get("role")?))
}

fn parse_actor((id, username, role): ActorColumns) -> RepoResult<Actor> {
    Ok(Actor {
        id: parse_uuid(&id, "actors.id")?,
        username,
        role: Role::parse(&role).map_err(|err| invalid_column("actors.role", err))?,
    })
}
