use crate::models::{
    DashboardStats, Dish, NewDish, NewRestaurant, NewUser, OtpKind, PlatformStats,
    RecentRestaurant, Restaurant, Role, UpdateDishRequest, UpdateRestaurantRequest, User,
    UserCredentials,
};
use crate::scope::{DishQuery, OwnershipScope, RestaurantQuery, SearchTerm};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// The persistence contract used by every handler. Scoped lookups and mutations
/// take an `OwnershipScope` and must treat a row outside the scope exactly like a
/// missing row (`None` / `false`), so callers cannot tell the two apart.
///
/// Errors are propagated, not swallowed: the handler boundary turns them into a
/// logged 500.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & Credentials ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    // Most recent first.
    async fn list_users(&self, limit: i64) -> RepoResult<Vec<User>>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>>;
    /// Flags every user whose email (or phone) equals `identifier` as verified.
    async fn mark_verified(&self, kind: OtpKind, identifier: &str) -> RepoResult<u64>;

    // --- One-Time Passcodes ---
    /// Invalidates outstanding codes for the identifier and stores a new one.
    async fn replace_otp(
        &self,
        identifier: &str,
        kind: OtpKind,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()>;
    /// Marks a matching unused, unexpired code as used. True if one was consumed.
    async fn consume_otp(&self, identifier: &str, kind: OtpKind, code: &str) -> RepoResult<bool>;

    // --- Restaurants ---
    async fn list_restaurants(&self, query: &RestaurantQuery) -> RepoResult<(Vec<Restaurant>, i64)>;
    async fn find_restaurant(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<Option<Restaurant>>;
    async fn list_restaurant_dishes(&self, restaurant_id: Uuid) -> RepoResult<Vec<Dish>>;
    async fn create_restaurant(&self, restaurant: NewRestaurant) -> RepoResult<Uuid>;
    /// Applies the supplied fields and replaces cuisines when present, atomically.
    /// `req.owner_id` is applied as given; callers strip it for non-admins.
    async fn update_restaurant(
        &self,
        id: Uuid,
        scope: OwnershipScope,
        req: UpdateRestaurantRequest,
    ) -> RepoResult<bool>;
    async fn delete_restaurant(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<bool>;

    // --- Dishes ---
    async fn list_dishes(&self, query: &DishQuery) -> RepoResult<(Vec<Dish>, i64)>;
    async fn find_dish(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<Option<Dish>>;
    async fn create_dish(&self, dish: NewDish) -> RepoResult<Uuid>;
    /// Applies the supplied fields and replaces ingredients / dietary tags when
    /// present, atomically.
    async fn update_dish(&self, id: Uuid, scope: OwnershipScope, req: UpdateDishRequest) -> RepoResult<bool>;
    async fn delete_dish(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<bool>;

    // --- Stats ---
    async fn dashboard_stats(&self, scope: OwnershipScope) -> RepoResult<DashboardStats>;
    async fn platform_stats(&self) -> RepoResult<PlatformStats>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, email, name, phone, role, email_verified, phone_verified, \
     onboarding_completed, subscription_tier, created_at, updated_at";

const RESTAURANT_SELECT: &str = r#"
    SELECT
        r.id, r.owner_id, u.name AS owner_name, u.email AS owner_email,
        r.name, r.description, r.address, r.lat, r.lng,
        r.phone, r.website, r.email, r.price_range, r.is_active,
        ARRAY(
            SELECT c.cuisine FROM restaurant_cuisines c
            WHERE c.restaurant_id = r.id ORDER BY c.position, c.id
        ) AS cuisines,
        (SELECT COUNT(*) FROM dishes d WHERE d.restaurant_id = r.id) AS dish_count,
        r.created_at, r.updated_at
    FROM restaurants r
    LEFT JOIN users u ON u.id = r.owner_id
    WHERE true
"#;

const DISH_SELECT: &str = r#"
    SELECT
        d.id, d.restaurant_id, r.name AS restaurant_name,
        d.name, d.description, d.image, d.price, d.cuisine,
        d.is_active, d.is_available,
        ARRAY(
            SELECT i.name FROM dish_ingredients i
            WHERE i.dish_id = d.id ORDER BY i.position, i.id
        ) AS ingredients,
        ARRAY(
            SELECT t.tag FROM dish_dietary_tags t
            WHERE t.dish_id = d.id ORDER BY t.position, t.id
        ) AS dietary_tags,
        d.allergens, d.created_at, d.updated_at
    FROM dishes d
    JOIN restaurants r ON r.id = d.restaurant_id
    WHERE true
"#;

/// The one-to-many string collections maintained with replace-children.
#[derive(Debug, Clone, Copy)]
enum ChildCollection {
    Cuisines,
    Ingredients,
    DietaryTags,
}

impl ChildCollection {
    /// (table, parent column, value column)
    fn columns(self) -> (&'static str, &'static str, &'static str) {
        match self {
            ChildCollection::Cuisines => ("restaurant_cuisines", "restaurant_id", "cuisine"),
            ChildCollection::Ingredients => ("dish_ingredients", "dish_id", "name"),
            ChildCollection::DietaryTags => ("dish_dietary_tags", "dish_id", "tag"),
        }
    }
}

/// Splits a tri-state update field into "was it supplied" and the value to
/// store, so an explicit `null` can clear a nullable column.
fn supplied<T>(field: Option<Option<T>>) -> (bool, Option<T>) {
    match field {
        Some(value) => (true, value),
        None => (false, None),
    }
}

/// replace_children
///
/// Deletes every child row of `parent` and inserts `values` in caller order,
/// duplicates included. Must run on the same transaction as the parent write.
async fn replace_children(
    conn: &mut PgConnection,
    collection: ChildCollection,
    parent: Uuid,
    values: &[String],
) -> RepoResult<()> {
    let (table, parent_column, value_column) = collection.columns();

    let delete = format!("DELETE FROM {} WHERE {} = $1", table, parent_column);
    sqlx::query(&delete).bind(parent).execute(&mut *conn).await?;

    if values.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {} ({}, {}, position) ",
        table, parent_column, value_column
    ));
    builder.push_values(values.iter().enumerate(), |mut row, (position, value)| {
        row.push_bind(parent)
            .push_bind(value.clone())
            .push_bind(position as i32);
    });
    builder.build().execute(&mut *conn).await?;
    Ok(())
}

fn push_restaurant_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    scope: OwnershipScope,
    search: Option<&SearchTerm>,
) {
    if let Some(owner) = scope.owner() {
        builder.push(" AND r.owner_id = ").push_bind(owner);
    }
    if let Some(term) = search {
        let pattern = term.like_pattern();
        builder
            .push(" AND (r.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.address ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_dish_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    scope: OwnershipScope,
    restaurant_id: Option<Uuid>,
    search: Option<&SearchTerm>,
) {
    // An explicit restaurant filter narrows the scope; it never widens it.
    if let Some(restaurant_id) = restaurant_id {
        builder.push(" AND d.restaurant_id = ").push_bind(restaurant_id);
    }
    if let Some(owner) = scope.owner() {
        builder.push(" AND r.owner_id = ").push_bind(owner);
    }
    if let Some(term) = search {
        let pattern = term.like_pattern();
        builder
            .push(" AND (d.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR d.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR r.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_credentials(&self, email: &str) -> RepoResult<Option<UserCredentials>> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            r#"INSERT INTO users
                (id, email, name, phone, role, password_hash, phone_verified,
                 onboarding_completed, subscription_tier, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
               RETURNING {}"#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email)
            .bind(user.name)
            .bind(user.phone)
            .bind(user.role.as_str())
            .bind(user.password_hash)
            .bind(user.phone_verified)
            .bind(user.onboarding_completed)
            .bind(user.subscription_tier)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_users(&self, limit: i64) -> RepoResult<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_verified(&self, kind: OtpKind, identifier: &str) -> RepoResult<u64> {
        let sql = match kind {
            OtpKind::Email => {
                "UPDATE users SET email_verified = true, updated_at = NOW() WHERE email = $1"
            }
            OtpKind::Phone => {
                "UPDATE users SET phone_verified = true, updated_at = NOW() WHERE phone = $1"
            }
        };
        let result = sqlx::query(sql).bind(identifier).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn replace_otp(
        &self,
        identifier: &str,
        kind: OtpKind,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE otp_verifications SET used = true
             WHERE identifier = $1 AND kind = $2 AND used = false",
        )
        .bind(identifier)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO otp_verifications (id, identifier, code, kind, used, expires_at, created_at)
             VALUES ($1, $2, $3, $4, false, $5, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(identifier)
        .bind(code)
        .bind(kind.as_str())
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    async fn consume_otp(&self, identifier: &str, kind: OtpKind, code: &str) -> RepoResult<bool> {
        // Select-and-flag in one statement so a code is never consumed twice.
        let consumed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE otp_verifications SET used = true
            WHERE id = (
                SELECT id FROM otp_verifications
                WHERE identifier = $1 AND kind = $2 AND code = $3
                  AND used = false AND expires_at > NOW()
                ORDER BY created_at DESC
                LIMIT 1
                FOR UPDATE
            )
            RETURNING id
            "#,
        )
        .bind(identifier)
        .bind(kind.as_str())
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(consumed.is_some())
    }

    /// list_restaurants
    ///
    /// Count and page share the same filter rendering, so `total` always
    /// describes exactly the rows the pages are cut from.
    async fn list_restaurants(&self, query: &RestaurantQuery) -> RepoResult<(Vec<Restaurant>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM restaurants r WHERE true");
        push_restaurant_filters(&mut count, query.scope, query.search.as_ref());
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page: QueryBuilder<Postgres> = QueryBuilder::new(RESTAURANT_SELECT);
        push_restaurant_filters(&mut page, query.scope, query.search.as_ref());
        page.push(" ORDER BY r.created_at DESC, r.id LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset());
        let items = page
            .build_query_as::<Restaurant>()
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }

    async fn find_restaurant(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<Option<Restaurant>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(RESTAURANT_SELECT);
        builder.push(" AND r.id = ").push_bind(id);
        push_restaurant_filters(&mut builder, scope, None);
        builder
            .build_query_as::<Restaurant>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_restaurant_dishes(&self, restaurant_id: Uuid) -> RepoResult<Vec<Dish>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(DISH_SELECT);
        builder
            .push(" AND d.restaurant_id = ")
            .push_bind(restaurant_id)
            .push(" ORDER BY d.created_at DESC, d.id");
        builder
            .build_query_as::<Dish>()
            .fetch_all(&self.pool)
            .await
    }

    async fn create_restaurant(&self, restaurant: NewRestaurant) -> RepoResult<Uuid> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO restaurants
                (id, owner_id, name, description, address, lat, lng, phone, website, email,
                 price_range, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, true, NOW(), NOW())"#,
        )
        .bind(id)
        .bind(restaurant.owner_id)
        .bind(&restaurant.name)
        .bind(&restaurant.description)
        .bind(&restaurant.address)
        .bind(restaurant.lat)
        .bind(restaurant.lng)
        .bind(&restaurant.phone)
        .bind(&restaurant.website)
        .bind(&restaurant.email)
        .bind(restaurant.price_range.as_str())
        .execute(&mut *tx)
        .await?;

        replace_children(&mut tx, ChildCollection::Cuisines, id, &restaurant.cuisines).await?;

        tx.commit().await?;
        Ok(id)
    }

    /// update_restaurant
    ///
    /// `COALESCE` keeps every column whose field was not supplied; nullable columns
    /// go through a `CASE` on the supplied flag so `null` clears them. The ownership
    /// scope is part of the `WHERE`, so an out-of-scope row is simply not matched.
    async fn update_restaurant(
        &self,
        id: Uuid,
        scope: OwnershipScope,
        req: UpdateRestaurantRequest,
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let (set_description, description) = supplied(req.description);
        let (set_phone, phone) = supplied(req.phone);
        let (set_website, website) = supplied(req.website);
        let (set_email, email) = supplied(req.email);
        let (change_owner, new_owner) = supplied(req.owner_id);

        let updated = sqlx::query(
            r#"
            UPDATE restaurants
            SET name = COALESCE($1, name),
                description = CASE WHEN $2 THEN $3::text ELSE description END,
                address = COALESCE($4, address),
                lat = COALESCE($5, lat),
                lng = COALESCE($6, lng),
                phone = CASE WHEN $7 THEN $8::text ELSE phone END,
                website = CASE WHEN $9 THEN $10::text ELSE website END,
                email = CASE WHEN $11 THEN $12::text ELSE email END,
                price_range = COALESCE($13, price_range),
                is_active = COALESCE($14, is_active),
                owner_id = CASE WHEN $15 THEN $16::uuid ELSE owner_id END,
                updated_at = NOW()
            WHERE id = $17 AND ($18::uuid IS NULL OR owner_id = $18)
            "#,
        )
        .bind(req.name)
        .bind(set_description)
        .bind(description)
        .bind(req.address)
        .bind(req.lat)
        .bind(req.lng)
        .bind(set_phone)
        .bind(phone)
        .bind(set_website)
        .bind(website)
        .bind(set_email)
        .bind(email)
        .bind(req.price_range.map(|p| p.as_str()))
        .bind(req.is_active)
        .bind(change_owner)
        .bind(new_owner)
        .bind(id)
        .bind(scope.owner())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }

        if let Some(cuisines) = &req.cuisines {
            replace_children(&mut tx, ChildCollection::Cuisines, id, cuisines).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_restaurant(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<bool> {
        // Dishes, their ingredients/tags and the cuisines go with it (ON DELETE CASCADE).
        let result =
            sqlx::query("DELETE FROM restaurants WHERE id = $1 AND ($2::uuid IS NULL OR owner_id = $2)")
                .bind(id)
                .bind(scope.owner())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_dishes(&self, query: &DishQuery) -> RepoResult<(Vec<Dish>, i64)> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM dishes d JOIN restaurants r ON r.id = d.restaurant_id WHERE true",
        );
        push_dish_filters(&mut count, query.scope, query.restaurant_id, query.search.as_ref());
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page: QueryBuilder<Postgres> = QueryBuilder::new(DISH_SELECT);
        push_dish_filters(&mut page, query.scope, query.restaurant_id, query.search.as_ref());
        page.push(" ORDER BY d.created_at DESC, d.id LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset());
        let items = page.build_query_as::<Dish>().fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    async fn find_dish(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<Option<Dish>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(DISH_SELECT);
        builder.push(" AND d.id = ").push_bind(id);
        push_dish_filters(&mut builder, scope, None, None);
        builder
            .build_query_as::<Dish>()
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_dish(&self, dish: NewDish) -> RepoResult<Uuid> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO dishes
                (id, restaurant_id, name, description, image, price, cuisine, allergens,
                 is_active, is_available, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())"#,
        )
        .bind(id)
        .bind(dish.restaurant_id)
        .bind(&dish.name)
        .bind(&dish.description)
        .bind(&dish.image)
        .bind(dish.price)
        .bind(&dish.cuisine)
        .bind(&dish.allergens)
        .bind(dish.is_active)
        .bind(dish.is_available)
        .execute(&mut *tx)
        .await?;

        replace_children(&mut tx, ChildCollection::Ingredients, id, &dish.ingredients).await?;
        replace_children(&mut tx, ChildCollection::DietaryTags, id, &dish.dietary_tags).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn update_dish(&self, id: Uuid, scope: OwnershipScope, req: UpdateDishRequest) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let (set_description, description) = supplied(req.description);
        let (set_image, image) = supplied(req.image);
        let (set_cuisine, cuisine) = supplied(req.cuisine);
        // `allergens` is a non-null array column, so `null` empties it.
        let allergens = req.allergens.map(Option::unwrap_or_default);

        let updated = sqlx::query(
            r#"
            UPDATE dishes d
            SET name = COALESCE($1, d.name),
                description = CASE WHEN $2 THEN $3::text ELSE d.description END,
                image = CASE WHEN $4 THEN $5::text ELSE d.image END,
                price = COALESCE($6, d.price),
                cuisine = CASE WHEN $7 THEN $8::text ELSE d.cuisine END,
                is_active = COALESCE($9, d.is_active),
                is_available = COALESCE($10, d.is_available),
                allergens = COALESCE($11, d.allergens),
                updated_at = NOW()
            FROM restaurants r
            WHERE d.id = $12
              AND r.id = d.restaurant_id
              AND ($13::uuid IS NULL OR r.owner_id = $13)
            "#,
        )
        .bind(req.name)
        .bind(set_description)
        .bind(description)
        .bind(set_image)
        .bind(image)
        .bind(req.price)
        .bind(set_cuisine)
        .bind(cuisine)
        .bind(req.is_active)
        .bind(req.is_available)
        .bind(allergens)
        .bind(id)
        .bind(scope.owner())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(ingredients) = &req.ingredients {
            replace_children(&mut tx, ChildCollection::Ingredients, id, ingredients).await?;
        }
        if let Some(tags) = &req.dietary_tags {
            replace_children(&mut tx, ChildCollection::DietaryTags, id, tags).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_dish(&self, id: Uuid, scope: OwnershipScope) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"DELETE FROM dishes d USING restaurants r
               WHERE d.id = $1 AND r.id = d.restaurant_id
                 AND ($2::uuid IS NULL OR r.owner_id = $2)"#,
        )
        .bind(id)
        .bind(scope.owner())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn dashboard_stats(&self, scope: OwnershipScope) -> RepoResult<DashboardStats> {
        let owner = scope.owner();

        let total_restaurants = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM restaurants WHERE ($1::uuid IS NULL OR owner_id = $1)",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let total_dishes = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM dishes d JOIN restaurants r ON r.id = d.restaurant_id
               WHERE ($1::uuid IS NULL OR r.owner_id = $1)"#,
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let active_restaurants = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM restaurants WHERE is_active AND ($1::uuid IS NULL OR owner_id = $1)",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        let recent = sqlx::query_as::<_, RecentRestaurant>(
            r#"SELECT id, name, created_at FROM restaurants
               WHERE ($1::uuid IS NULL OR owner_id = $1)
               ORDER BY created_at DESC LIMIT 3"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_restaurants,
            total_dishes,
            total_users,
            active_restaurants,
            recent_activity: recent.into_iter().map(Into::into).collect(),
        })
    }

    async fn platform_stats(&self) -> RepoResult<PlatformStats> {
        let count = |sql: &'static str| sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool);

        Ok(PlatformStats {
            total_users: count("SELECT COUNT(*) FROM users").await?,
            total_restaurants: count("SELECT COUNT(*) FROM restaurants").await?,
            total_dishes: count("SELECT COUNT(*) FROM dishes").await?,
            active_users: count(
                "SELECT COUNT(*) FROM users WHERE updated_at >= NOW() - INTERVAL '7 days'",
            )
            .await?,
            new_users_today: count(
                "SELECT COUNT(*) FROM users WHERE created_at >= date_trunc('day', NOW())",
            )
            .await?,
        })
    }
}
