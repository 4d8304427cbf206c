#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use dish_console::{
    AppState, create_router,
    auth::hash_password,
    config::{AppConfig, Env},
    models::{
        ActivityItem, DashboardStats, Dish, NewDish, NewRestaurant, NewUser, OtpKind,
        PlatformStats, RecentRestaurant, Restaurant, Role, UpdateDishRequest,
        UpdateRestaurantRequest, User, UserCredentials,
    },
    moderation::{MockModerator, ModeratorState},
    repository::{RepoResult, Repository, RepositoryState},
    scope::{DishQuery, OwnershipScope, RestaurantQuery},
    storage::{MockStorageService, StorageState},
};
use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

// --- IN-MEMORY REPOSITORY ---

struct OtpRow {
    identifier: String,
    kind: OtpKind,
    code: String,
    used: bool,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    // All vectors are in insertion order; "newest first" reads iterate in reverse.
    users: Vec<(User, String)>,
    otps: Vec<OtpRow>,
    restaurants: Vec<Restaurant>,
    dishes: Vec<Dish>,
}

impl Store {
    fn render_restaurant(&self, r: &Restaurant) -> Restaurant {
        let owner = r
            .owner_id
            .and_then(|id| self.users.iter().find(|(u, _)| u.id == id));
        Restaurant {
            owner_name: owner.and_then(|(u, _)| u.name.clone()),
            owner_email: owner.map(|(u, _)| u.email.clone()),
            dish_count: self
                .dishes
                .iter()
                .filter(|d| d.restaurant_id == r.id)
                .count() as i64,
            ..r.clone()
        }
    }

    fn parent(&self, dish: &Dish) -> Option<&Restaurant> {
        self.restaurants.iter().find(|r| r.id == dish.restaurant_id)
    }

    fn render_dish(&self, d: &Dish) -> Dish {
        Dish {
            restaurant_name: self.parent(d).map(|r| r.name.clone()).unwrap_or_default(),
            ..d.clone()
        }
    }

    fn dish_in_scope(&self, d: &Dish, scope: OwnershipScope) -> bool {
        self.parent(d).is_some_and(|r| scope.admits(r.owner_id))
    }
}

/// InMemoryRepo
///
/// A `Repository` over plain vectors with the same scoping, search, pagination
/// and cascade rules as the Postgres implementation. Setting `failing` makes
/// every call error, to exercise the 500 path.
#[derive(Default)]
pub struct InMemoryRepo {
    store: Mutex<Store>,
    pub failing: AtomicBool,
}

impl InMemoryRepo {
    fn check(&self) -> RepoResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }

    pub fn seed_user(&self, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let email = format!("{}-{}@example.com", role.as_str(), id.simple());
        self.seed_user_with(id, &email, role);
        id
    }

    pub fn seed_user_with(&self, id: Uuid, email: &str, role: Role) {
        let now = Utc::now();
        let user = User {
            id,
            email: email.to_string(),
            name: Some(format!("{} user", role.as_str())),
            phone: None,
            role,
            email_verified: true,
            phone_verified: false,
            onboarding_completed: true,
            subscription_tier: "free".to_string(),
            created_at: now,
            updated_at: now,
        };
        let hash = hash_password(TEST_PASSWORD).expect("hash");
        self.store.lock().unwrap().users.push((user, hash));
    }

    pub fn remove_user(&self, id: Uuid) {
        self.store.lock().unwrap().users.retain(|(u, _)| u.id != id);
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.store
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone())
    }

    pub fn user_by_email(&self, email: &str) -> Option<(User, String)> {
        self.store
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .cloned()
    }

    /// Codes still usable for the identifier, oldest first.
    pub fn live_codes(&self, identifier: &str) -> Vec<String> {
        self.store
            .lock()
            .unwrap()
            .otps
            .iter()
            .filter(|o| o.identifier == identifier && !o.used && o.expires_at > Utc::now())
            .map(|o| o.code.clone())
            .collect()
    }

    pub fn expire_codes(&self, identifier: &str) {
        for otp in self.store.lock().unwrap().otps.iter_mut() {
            if otp.identifier == identifier {
                otp.expires_at = Utc::now() - Duration::minutes(1);
            }
        }
    }

    pub fn seed_restaurant(&self, owner_id: Option<Uuid>, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.store.lock().unwrap().restaurants.push(Restaurant {
            id,
            owner_id,
            name: name.to_string(),
            address: "1 Test Street".to_string(),
            lat: 53.34,
            lng: -6.26,
            is_active: true,
            created_at: now,
            updated_at: now,
            ..Restaurant::default()
        });
        id
    }

    pub fn seed_dish(&self, restaurant_id: Uuid, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.store.lock().unwrap().dishes.push(Dish {
            id,
            restaurant_id,
            name: name.to_string(),
            price: 9.5,
            is_active: true,
            is_available: true,
            created_at: now,
            updated_at: now,
            ..Dish::default()
        });
        id
    }

    pub fn restaurant_count(&self) -> usize {
        self.store.lock().unwrap().restaurants.len()
    }

    pub fn dish_count(&self) -> usize {
        self.store.lock().unwrap().dishes.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        self.check()?;
        Ok(self.user(id))
    }

    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        self.check()?;
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(user, hash)| UserCredentials {
                user: user.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        self.check()?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: Some(new.name),
            phone: new.phone,
            role: new.role,
            email_verified: false,
            phone_verified: new.phone_verified,
            onboarding_completed: new.onboarding_completed,
            subscription_tier: new.subscription_tier,
            created_at: now,
            updated_at: now,
        };
        self.store
            .lock()
            .unwrap()
            .users
            .push((user.clone(), new.password_hash));
        Ok(user)
    }

    async fn list_users(&self, limit: i64) -> RepoResult<Vec<User>> {
        self.check()?;
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .rev()
            .take(limit as usize)
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        Ok(store.users.iter_mut().find(|(u, _)| u.id == id).map(|(u, _)| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn mark_verified(&self, kind: OtpKind, identifier: &str) -> RepoResult<u64> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        let mut changed = 0;
        for (user, _) in store.users.iter_mut() {
            match kind {
                OtpKind::Email if user.email == identifier => user.email_verified = true,
                OtpKind::Phone if user.phone.as_deref() == Some(identifier) => {
                    user.phone_verified = true
                }
                _ => continue,
            }
            changed += 1;
        }
        Ok(changed)
    }

    async fn replace_otp(
        &self,
        identifier: &str,
        kind: OtpKind,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        for otp in store.otps.iter_mut() {
            if otp.identifier == identifier && otp.kind == kind {
                otp.used = true;
            }
        }
        store.otps.push(OtpRow {
            identifier: identifier.to_string(),
            kind,
            code: code.to_string(),
            used: false,
            expires_at,
        });
        Ok(())
    }

    async fn consume_otp(&self, identifier: &str, kind: OtpKind, code: &str) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        let now = Utc::now();
        match store.otps.iter_mut().rev().find(|o| {
            o.identifier == identifier
                && o.kind == kind
                && o.code == code
                && !o.used
                && o.expires_at > now
        }) {
            Some(otp) => {
                otp.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_restaurants(&self, query: &RestaurantQuery) -> RepoResult<(Vec<Restaurant>, i64)> {
        self.check()?;
        let store = self.store.lock().unwrap();
        let matching: Vec<&Restaurant> = store
            .restaurants
            .iter()
            .rev()
            .filter(|r| query.scope.admits(r.owner_id))
            .filter(|r| {
                query.search.as_ref().is_none_or(|term| {
                    term.matches_any(&[
                        Some(r.name.as_str()),
                        r.description.as_deref(),
                        Some(r.address.as_str()),
                    ])
                })
            })
            .collect();
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit as usize)
            .map(|r| store.render_restaurant(r))
            .collect();
        Ok((items, total))
    }

    async fn find_restaurant(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<Option<Restaurant>> {
        self.check()?;
        let store = self.store.lock().unwrap();
        Ok(store
            .restaurants
            .iter()
            .find(|r| r.id == id && scope.admits(r.owner_id))
            .map(|r| store.render_restaurant(r)))
    }

    async fn list_restaurant_dishes(&self, restaurant_id: Uuid) -> RepoResult<Vec<Dish>> {
        self.check()?;
        let store = self.store.lock().unwrap();
        Ok(store
            .dishes
            .iter()
            .rev()
            .filter(|d| d.restaurant_id == restaurant_id)
            .map(|d| store.render_dish(d))
            .collect())
    }

    async fn create_restaurant(&self, new: NewRestaurant) -> RepoResult<Uuid> {
        self.check()?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.store.lock().unwrap().restaurants.push(Restaurant {
            id,
            owner_id: new.owner_id,
            owner_name: None,
            owner_email: None,
            name: new.name,
            description: new.description,
            address: new.address,
            lat: new.lat,
            lng: new.lng,
            phone: new.phone,
            website: new.website,
            email: new.email,
            price_range: new.price_range,
            is_active: true,
            cuisines: new.cuisines,
            dish_count: 0,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update_restaurant(
        &self,
        id: Uuid,
        scope: OwnershipScope,
        req: UpdateRestaurantRequest,
    ) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        let Some(r) = store
            .restaurants
            .iter_mut()
            .find(|r| r.id == id && scope.admits(r.owner_id))
        else {
            return Ok(false);
        };
        if let Some(v) = req.name {
            r.name = v;
        }
        if let Some(v) = req.description {
            r.description = v;
        }
        if let Some(v) = req.address {
            r.address = v;
        }
        if let Some(v) = req.lat {
            r.lat = v;
        }
        if let Some(v) = req.lng {
            r.lng = v;
        }
        if let Some(v) = req.phone {
            r.phone = v;
        }
        if let Some(v) = req.website {
            r.website = v;
        }
        if let Some(v) = req.email {
            r.email = v;
        }
        if let Some(v) = req.price_range {
            r.price_range = v;
        }
        if let Some(v) = req.is_active {
            r.is_active = v;
        }
        if let Some(owner) = req.owner_id {
            r.owner_id = owner;
        }
        if let Some(cuisines) = req.cuisines {
            r.cuisines = cuisines;
        }
        r.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_restaurant(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        let before = store.restaurants.len();
        store
            .restaurants
            .retain(|r| !(r.id == id && scope.admits(r.owner_id)));
        if store.restaurants.len() == before {
            return Ok(false);
        }
        store.dishes.retain(|d| d.restaurant_id != id);
        Ok(true)
    }

    async fn list_dishes(&self, query: &DishQuery) -> RepoResult<(Vec<Dish>, i64)> {
        self.check()?;
        let store = self.store.lock().unwrap();
        let matching: Vec<&Dish> = store
            .dishes
            .iter()
            .rev()
            .filter(|d| store.dish_in_scope(d, query.scope))
            .filter(|d| query.restaurant_id.is_none_or(|id| d.restaurant_id == id))
            .filter(|d| {
                query.search.as_ref().is_none_or(|term| {
                    let parent = store.parent(d).map(|r| r.name.as_str());
                    term.matches_any(&[Some(d.name.as_str()), d.description.as_deref(), parent])
                })
            })
            .collect();
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit as usize)
            .map(|d| store.render_dish(d))
            .collect();
        Ok((items, total))
    }

    async fn find_dish(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<Option<Dish>> {
        self.check()?;
        let store = self.store.lock().unwrap();
        Ok(store
            .dishes
            .iter()
            .find(|d| d.id == id && store.dish_in_scope(d, scope))
            .map(|d| store.render_dish(d)))
    }

    async fn create_dish(&self, new: NewDish) -> RepoResult<Uuid> {
        self.check()?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.store.lock().unwrap().dishes.push(Dish {
            id,
            restaurant_id: new.restaurant_id,
            restaurant_name: String::new(),
            name: new.name,
            description: new.description,
            image: new.image,
            price: new.price,
            cuisine: new.cuisine,
            is_active: new.is_active,
            is_available: new.is_available,
            ingredients: new.ingredients,
            dietary_tags: new.dietary_tags,
            allergens: new.allergens,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update_dish(&self, id: Uuid, scope: OwnershipScope, req: UpdateDishRequest) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        let in_scope = store
            .dishes
            .iter()
            .any(|d| d.id == id && store.dish_in_scope(d, scope));
        if !in_scope {
            return Ok(false);
        }
        let Some(d) = store.dishes.iter_mut().find(|d| d.id == id) else {
            return Ok(false);
        };
        if let Some(v) = req.name {
            d.name = v;
        }
        if let Some(v) = req.description {
            d.description = v;
        }
        if let Some(v) = req.image {
            d.image = v;
        }
        if let Some(v) = req.price {
            d.price = v;
        }
        if let Some(v) = req.cuisine {
            d.cuisine = v;
        }
        if let Some(v) = req.is_active {
            d.is_active = v;
        }
        if let Some(v) = req.is_available {
            d.is_available = v;
        }
        if let Some(v) = req.allergens {
            d.allergens = v.unwrap_or_default();
        }
        if let Some(v) = req.ingredients {
            d.ingredients = v;
        }
        if let Some(v) = req.dietary_tags {
            d.dietary_tags = v;
        }
        d.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_dish(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<bool> {
        self.check()?;
        let mut store = self.store.lock().unwrap();
        let in_scope = store
            .dishes
            .iter()
            .any(|d| d.id == id && store.dish_in_scope(d, scope));
        if in_scope {
            store.dishes.retain(|d| d.id != id);
        }
        Ok(in_scope)
    }

    async fn dashboard_stats(&self, scope: OwnershipScope) -> RepoResult<DashboardStats> {
        self.check()?;
        let store = self.store.lock().unwrap();
        let restaurants: Vec<&Restaurant> = store
            .restaurants
            .iter()
            .filter(|r| scope.admits(r.owner_id))
            .collect();
        Ok(DashboardStats {
            total_restaurants: restaurants.len() as i64,
            total_dishes: store
                .dishes
                .iter()
                .filter(|d| store.dish_in_scope(d, scope))
                .count() as i64,
            total_users: store.users.len() as i64,
            active_restaurants: restaurants.iter().filter(|r| r.is_active).count() as i64,
            recent_activity: restaurants
                .iter()
                .rev()
                .take(3)
                .map(|r| {
                    ActivityItem::from(RecentRestaurant {
                        id: r.id,
                        name: r.name.clone(),
                        created_at: r.created_at,
                    })
                })
                .collect(),
        })
    }

    async fn platform_stats(&self) -> RepoResult<PlatformStats> {
        self.check()?;
        let store = self.store.lock().unwrap();
        let week_ago = Utc::now() - Duration::days(7);
        let today = Utc::now().date_naive();
        Ok(PlatformStats {
            total_users: store.users.len() as i64,
            total_restaurants: store.restaurants.len() as i64,
            total_dishes: store.dishes.len() as i64,
            active_users: store
                .users
                .iter()
                .filter(|(u, _)| u.updated_at >= week_ago)
                .count() as i64,
            new_users_today: store
                .users
                .iter()
                .filter(|(u, _)| u.created_at.date_naive() == today)
                .count() as i64,
        })
    }
}

// --- TEST APPLICATION ---

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepo>,
    pub storage: MockStorageService,
    pub config: AppConfig,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(Env::Local, MockModerator::approving(), MockStorageService::new())
}

pub fn spawn_app_with(env: Env, moderator: MockModerator, storage: MockStorageService) -> TestApp {
    let repo = Arc::new(InMemoryRepo::default());
    let config = AppConfig {
        env,
        ..AppConfig::default()
    };
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: Arc::new(storage.clone()) as StorageState,
        moderator: Arc::new(moderator) as ModeratorState,
        config: config.clone(),
    };
    TestApp {
        router: create_router(state),
        repo,
        storage,
        config,
    }
}

impl TestApp {
    /// Sends a request as `user` (via the local `x-user-id` header) and returns
    /// the status with the JSON body (`Null` when the body is not JSON).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = user {
            builder = builder.header("x-user-id", id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: Uuid) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: Uuid, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: Uuid, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(user), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: Uuid, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: Uuid) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(user), None).await
    }
}

/// Names of the items of a list response, in response order.
pub fn item_names(body: &Value) -> Vec<String> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
