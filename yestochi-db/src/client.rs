use crate::{
    kv::KeyValueStore,
    record::{CommentRecord, PostRecord, UserIndex, UserRecord},
    seed,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::BTreeMap,
    fmt::{Debug, Formatter},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::task::{self, JoinError};
use tracing::{debug, error, warn};
use yestochi_common::{
    model::{
        Id, YestochiSnowflakeGenerator,
        auth::{Password, PasswordHash, PasswordHashError},
        message::{Message, ThreadKey},
        nickname::{Nickname, Nicknames},
        post::{Comment, CommentText, Post, PostContent, PostMarker},
        user::{CreateUser, User, UserMarker, UserPatch},
    },
    snowflake::NodeId,
};

pub const USERS_KEY: &str = "yestochi_users";
pub const POSTS_KEY: &str = "yestochi_posts";
pub const MESSAGES_KEY: &str = "yestochi_messages";
pub const NICKNAMES_KEY: &str = "yestochi_nicknames";
pub const LOGGED_IN_USER_ID_KEY: &str = "yestochi_loggedInUserId";

pub const SIMULATED_LATENCY: Duration = Duration::from_millis(200);

pub type Result<T, E = DbError> = std::result::Result<T, E>;

pub type MessageThreads = BTreeMap<ThreadKey, Vec<Message>>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("The name {0:?} is already taken.")]
    NameTaken(String),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("Password hashing task failed: {0}")]
    HashTask(#[from] JoinError),
}

/// The persistence service behind the UI.
///
/// All collections live as JSON values in a [`KeyValueStore`]. Every operation
/// reads what it needs, writes whole collections back and then waits for the
/// configured latency before returning, imitating a network round-trip.
/// Mutations are serialized so overlapping calls cannot lose each other's
/// writes. Storage faults are logged and treated as empty collections.
pub struct DbClient {
    store: Arc<dyn KeyValueStore>,
    snowflake_generator: Mutex<YestochiSnowflakeGenerator>,
    write_lock: tokio::sync::Mutex<()>,
    latency: Duration,
    argon2: Argon2<'static>,
}

impl DbClient {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, node_id: NodeId) -> Self {
        Self {
            store,
            snowflake_generator: Mutex::new(YestochiSnowflakeGenerator::new(node_id)),
            write_lock: tokio::sync::Mutex::new(()),
            latency: SIMULATED_LATENCY,
            argon2: Argon2::default(),
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Argon2 cost parameters for newly hashed passwords. Existing hashes keep
    /// the parameters they were created with.
    #[must_use]
    pub fn with_password_params(mut self, params: Params) -> Self {
        self.argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        self
    }

    /// Seeds every collection that is not in the store yet. Never overwrites.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if !self.contains(USERS_KEY) {
            debug!("Seeding users");
            let argon2 = self.argon2.clone();
            let users = task::spawn_blocking(move || seed::users(&argon2)).await??;
            self.write(USERS_KEY, &users);
        }
        if !self.contains(POSTS_KEY) {
            debug!("Seeding posts");
            self.write(POSTS_KEY, &seed::posts());
        }
        if !self.contains(MESSAGES_KEY) {
            self.write(MESSAGES_KEY, &BTreeMap::<ThreadKey, Vec<CommentRecord>>::new());
        }
        if !self.contains(NICKNAMES_KEY) {
            debug!("Seeding nicknames");
            self.write(NICKNAMES_KEY, &seed::nicknames());
        }

        Ok(())
    }

    // --- Users ---

    pub async fn list_users(&self) -> Vec<User> {
        let users = self
            .user_records()
            .into_iter()
            .map(|record| record.user)
            .collect();

        self.simulate_latency(users).await
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Option<User> {
        let user = self.find_user(user_id);

        self.simulate_latency(user).await
    }

    /// Looks the user up by name, ignoring case, and checks the password.
    /// On success the user becomes the logged-in user.
    pub async fn authenticate(&self, name: &str, password: &Password) -> Option<User> {
        let mut user = None;
        if let Some(UserRecord {
            user: candidate,
            password_hash: Some(hash),
        }) = self
            .user_records()
            .into_iter()
            .find(|record| record.user.name.matches(name))
        {
            let password = password.clone();
            match task::spawn_blocking(move || hash.verify(&password)).await {
                Ok(true) => user = Some(candidate),
                Ok(false) => {}
                Err(err) => error!(error = %err, "Password verification task failed"),
            }
        }

        if let Some(user) = &user {
            debug!(user_id = %user.id, "User logged in");
            self.write(LOGGED_IN_USER_ID_KEY, &user.id);
        }

        self.simulate_latency(user).await
    }

    /// Creates the user and logs them in.
    pub async fn register(&self, create_user: CreateUser) -> Result<User> {
        let password_hash = self.hash_password(create_user.password.clone()).await?;

        let guard = self.write_lock.lock().await;

        let mut users = self.user_records();
        if users
            .iter()
            .any(|record| record.user.name.matches(create_user.name.get()))
        {
            return Err(DbError::NameTaken(create_user.name.into_inner()));
        }

        let user = User::from_registration(self.generate_id(), create_user);
        users.push(UserRecord {
            user: user.clone(),
            password_hash: Some(password_hash),
        });
        self.write(USERS_KEY, &users);
        self.write(LOGGED_IN_USER_ID_KEY, &user.id);
        drop(guard);

        debug!(user_id = %user.id, "Registered user");
        Ok(self.simulate_latency(user).await)
    }

    /// Forgets the logged-in user. Nothing else changes.
    pub async fn logout(&self) {
        if let Err(err) = self.store.remove(LOGGED_IN_USER_ID_KEY) {
            error!(key = LOGGED_IN_USER_ID_KEY, error = %err, "Error removing from store");
        }

        self.simulate_latency(()).await;
    }

    pub async fn fetch_logged_in_user(&self) -> Option<User> {
        let user = self
            .read_optional::<Id<UserMarker>>(LOGGED_IN_USER_ID_KEY)
            .and_then(|user_id| self.find_user(user_id));

        self.simulate_latency(user).await
    }

    /// Merges `patch` into the user. A new name must not belong to anyone
    /// else, ignoring case. Posts, comments and messages pick up the
    /// change on their next read since they only store the author id.
    pub async fn update_user_profile(
        &self,
        user_id: Id<UserMarker>,
        patch: UserPatch,
    ) -> Result<User> {
        let guard = self.write_lock.lock().await;

        let mut users = self.user_records();
        let position = users
            .iter()
            .position(|record| record.user.id == user_id)
            .ok_or(DbError::UserByIdNotFound(user_id))?;
        if let Some(name) = &patch.name
            && users
                .iter()
                .any(|record| record.user.id != user_id && record.user.name.matches(name.get()))
        {
            return Err(DbError::NameTaken(name.get().to_owned()));
        }

        let record = &mut users[position];
        record.user.apply(patch);
        let user = record.user.clone();
        self.write(USERS_KEY, &users);
        drop(guard);

        debug!(%user_id, "Updated user profile");
        Ok(self.simulate_latency(user).await)
    }

    // --- Posts ---

    /// All posts, newest first.
    pub async fn list_posts(&self) -> Vec<Post> {
        let users = self.user_records();
        let posts = join_posts(self.post_records(), &UserIndex::new(&users));

        self.simulate_latency(posts).await
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Option<Post> {
        let users = self.user_records();
        let post = self
            .post_records()
            .into_iter()
            .find(|post| post.id == post_id)
            .and_then(|post| post.join(&UserIndex::new(&users)));

        self.simulate_latency(post).await
    }

    /// Posts written by the user, newest first. `None` if there is no such user.
    pub async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Option<Vec<Post>> {
        let users = self.user_records();
        let index = UserIndex::new(&users);

        let posts = index.contains(user_id).then(|| {
            let records = self
                .post_records()
                .into_iter()
                .filter(|post| post.author_id == user_id)
                .collect();
            join_posts(records, &index)
        });

        self.simulate_latency(posts).await
    }

    /// Puts a new post in front of all others.
    pub async fn create_post(&self, content: PostContent, author_id: Id<UserMarker>) -> Result<Post> {
        let guard = self.write_lock.lock().await;

        let users = self.user_records();
        let index = UserIndex::new(&users);
        if !index.contains(author_id) {
            return Err(DbError::UserByIdNotFound(author_id));
        }

        let (text, image) = content.into_parts();
        let record = PostRecord {
            id: self.generate_id(),
            author_id,
            text,
            image,
            timestamp: OffsetDateTime::now_utc(),
            likes: 0,
            is_liked: false,
            comments: Vec::new(),
        };
        let post = record
            .join(&index)
            .ok_or(DbError::UserByIdNotFound(author_id))?;

        let mut posts = self.post_records();
        posts.insert(0, record);
        self.write(POSTS_KEY, &posts);
        drop(guard);

        debug!(post_id = %post.id, %author_id, "Created post");
        Ok(self.simulate_latency(post).await)
    }

    /// Flips the viewer's like on the post and adjusts its like count.
    pub async fn toggle_like(&self, post_id: Id<PostMarker>) -> Result<Post> {
        let guard = self.write_lock.lock().await;

        let users = self.user_records();
        let mut posts = self.post_records();
        let record = posts
            .iter_mut()
            .find(|post| post.id == post_id)
            .ok_or(DbError::PostByIdNotFound(post_id))?;
        record.toggle_like();
        let post = record
            .join(&UserIndex::new(&users))
            .ok_or(DbError::PostByIdNotFound(post_id))?;
        self.write(POSTS_KEY, &posts);
        drop(guard);

        Ok(self.simulate_latency(post).await)
    }

    pub async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        text: CommentText,
        author_id: Id<UserMarker>,
    ) -> Result<Comment> {
        let guard = self.write_lock.lock().await;

        let users = self.user_records();
        let index = UserIndex::new(&users);
        let mut posts = self.post_records();
        let post = posts
            .iter_mut()
            .find(|post| post.id == post_id)
            .ok_or(DbError::PostByIdNotFound(post_id))?;

        let record = CommentRecord {
            id: self.generate_id(),
            author_id,
            text: text.into_inner(),
            timestamp: OffsetDateTime::now_utc(),
        };
        let comment = record
            .join(&index)
            .ok_or(DbError::UserByIdNotFound(author_id))?;
        post.comments.push(record);
        self.write(POSTS_KEY, &posts);
        drop(guard);

        debug!(%post_id, comment_id = %comment.id, "Added comment");
        Ok(self.simulate_latency(comment).await)
    }

    /// Removes the post if it exists and returns the posts that remain.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Vec<Post> {
        let guard = self.write_lock.lock().await;

        let users = self.user_records();
        let mut posts = self.post_records();
        posts.retain(|post| post.id != post_id);
        self.write(POSTS_KEY, &posts);
        drop(guard);

        debug!(%post_id, "Deleted post");
        let posts = join_posts(posts, &UserIndex::new(&users));
        self.simulate_latency(posts).await
    }

    // --- Nicknames ---

    pub async fn list_nicknames(&self) -> Nicknames {
        let nicknames = self.read(NICKNAMES_KEY);

        self.simulate_latency(nicknames).await
    }

    pub async fn fetch_nickname(&self, user_id: Id<UserMarker>) -> Option<Nickname> {
        let nickname = self.read::<Nicknames>(NICKNAMES_KEY).remove(&user_id);

        self.simulate_latency(nickname).await
    }

    /// Sets the alias, or removes it when `alias` is blank. Returns all nicknames.
    pub async fn set_nickname(&self, user_id: Id<UserMarker>, alias: &str) -> Nicknames {
        let guard = self.write_lock.lock().await;

        let mut nicknames: Nicknames = self.read(NICKNAMES_KEY);
        match Nickname::new(alias) {
            Some(nickname) => {
                nicknames.insert(user_id, nickname);
            }
            None => {
                nicknames.remove(&user_id);
            }
        }
        self.write(NICKNAMES_KEY, &nicknames);
        drop(guard);

        self.simulate_latency(nicknames).await
    }

    // --- Messages ---

    pub async fn list_message_threads(&self) -> MessageThreads {
        let users = self.user_records();
        let index = UserIndex::new(&users);
        let threads = self
            .message_records()
            .into_iter()
            .map(|(key, messages)| (key, join_comments(&messages, &index)))
            .collect();

        self.simulate_latency(threads).await
    }

    /// The conversation between two users, oldest message first.
    pub async fn fetch_thread(&self, first: Id<UserMarker>, second: Id<UserMarker>) -> Vec<Message> {
        let users = self.user_records();
        let messages = self
            .message_records()
            .remove(&ThreadKey::new(first, second))
            .map(|messages| join_comments(&messages, &UserIndex::new(&users)))
            .unwrap_or_default();

        self.simulate_latency(messages).await
    }

    pub async fn send_message(
        &self,
        from: Id<UserMarker>,
        to: Id<UserMarker>,
        text: CommentText,
    ) -> Result<Message> {
        let guard = self.write_lock.lock().await;

        let users = self.user_records();
        let index = UserIndex::new(&users);
        if !index.contains(to) {
            return Err(DbError::UserByIdNotFound(to));
        }

        let record = CommentRecord {
            id: self.generate_id(),
            author_id: from,
            text: text.into_inner(),
            timestamp: OffsetDateTime::now_utc(),
        };
        let message = record.join(&index).ok_or(DbError::UserByIdNotFound(from))?;

        let mut threads = self.message_records();
        threads
            .entry(ThreadKey::new(from, to))
            .or_default()
            .push(record);
        self.write(MESSAGES_KEY, &threads);
        drop(guard);

        debug!(%from, %to, "Sent message");
        Ok(self.simulate_latency(message).await)
    }

    /// Hashing is CPU-bound and runs on the blocking pool.
    async fn hash_password(&self, password: Password) -> Result<PasswordHash> {
        let argon2 = self.argon2.clone();
        Ok(task::spawn_blocking(move || password.hash(&argon2)).await??)
    }

    // --- Storage ---

    fn generate_id<Marker>(&self) -> Id<Marker> {
        self.snowflake_generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .into()
    }

    fn find_user(&self, user_id: Id<UserMarker>) -> Option<User> {
        self.user_records()
            .into_iter()
            .find(|record| record.user.id == user_id)
            .map(|record| record.user)
    }

    fn user_records(&self) -> Vec<UserRecord> {
        self.read(USERS_KEY)
    }

    fn post_records(&self) -> Vec<PostRecord> {
        self.read(POSTS_KEY)
    }

    fn message_records(&self) -> BTreeMap<ThreadKey, Vec<CommentRecord>> {
        self.read(MESSAGES_KEY)
    }

    /// Presence check used by seeding. A failing read counts as present so
    /// that seeding cannot clobber data it merely failed to see.
    fn contains(&self, key: &str) -> bool {
        match self.store.get(key) {
            Ok(value) => value.is_some(),
            Err(err) => {
                error!(key, error = %err, "Error reading from store");
                true
            }
        }
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.read_optional(key).unwrap_or_default()
    }

    fn read_optional<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(err) => {
                error!(key, error = %err, "Error reading from store");
                return None;
            }
        };

        serde_json::from_str(&raw)
            .inspect_err(|err| error!(key, error = %err, "Stored value could not be decoded"))
            .ok()
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(|err| err.to_string())
            .and_then(|raw| self.store.set(key, &raw).map_err(|err| err.to_string()));

        if let Err(err) = result {
            error!(key, error = %err, "Error writing to store");
        }
    }

    async fn simulate_latency<T>(&self, value: T) -> T {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        value
    }
}

impl Debug for DbClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbClient")
            .field("store", &self.store)
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

fn join_posts(records: Vec<PostRecord>, users: &UserIndex<'_>) -> Vec<Post> {
    records
        .into_iter()
        .filter_map(|record| {
            let post = record.join(users);
            if post.is_none() {
                warn!(post_id = %record.id, author_id = %record.author_id, "Skipping post by unknown author");
            }
            post
        })
        .collect()
}

fn join_comments(records: &[CommentRecord], users: &UserIndex<'_>) -> Vec<Comment> {
    records
        .iter()
        .filter_map(|record| {
            let comment = record.join(users);
            if comment.is_none() {
                warn!(comment_id = %record.id, author_id = %record.author_id, "Skipping message by unknown author");
            }
            comment
        })
        .collect()
}
