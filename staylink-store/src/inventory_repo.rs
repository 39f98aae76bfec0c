use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use staylink_core::repository::{AddOnRecord, HotelRecord, InventoryRepository, RatePlanRecord, RoomTypeRecord};

pub struct PostgresInventoryRepository {
    pub pool: PgPool,
}

impl PostgresInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct HotelRow {
    id: String,
    slug: String,
    name: String,
    city: String,
    country: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    description: Option<String>,
    star_rating: f32,
    review_score: Option<f32>,
    review_count: i32,
    currency: String,
    amenities: Vec<String>,
    images: Vec<String>,
}

impl From<HotelRow> for HotelRecord {
    fn from(row: HotelRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            city: row.city,
            country: row.country,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            description: row.description,
            star_rating: row.star_rating,
            review_score: row.review_score,
            review_count: row.review_count.max(0) as u32,
            currency: row.currency,
            amenities: row.amenities,
            images: row.images,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoomTypeRow {
    id: String,
    hotel_id: String,
    name: String,
    description: Option<String>,
    max_adults: i32,
    max_children: i32,
    max_occupancy: i32,
    size_sqm: Option<f32>,
    view: Option<String>,
}

impl From<RoomTypeRow> for RoomTypeRecord {
    fn from(row: RoomTypeRow) -> Self {
        Self {
            id: row.id,
            hotel_id: row.hotel_id,
            name: row.name,
            description: row.description,
            max_adults: row.max_adults.max(0) as u32,
            max_children: row.max_children.max(0) as u32,
            max_occupancy: row.max_occupancy.max(0) as u32,
            size_sqm: row.size_sqm,
            view: row.view,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RatePlanRow {
    id: String,
    room_type_id: String,
    hotel_id: String,
    name: String,
    board_type: String,
    rate_type: String,
    payment_type: String,
    is_refundable: bool,
    currency: String,
    base_rate: Decimal,
    taxes: Decimal,
    fees: Decimal,
    available_rooms: i32,
    cancellation_policy_name: Option<String>,
    cancellation_policy_description: Option<String>,
    free_cancellation_hours: Option<i64>,
}

impl From<RatePlanRow> for RatePlanRecord {
    fn from(row: RatePlanRow) -> Self {
        Self {
            id: row.id,
            room_type_id: row.room_type_id,
            hotel_id: row.hotel_id,
            name: row.name,
            board_type: row.board_type,
            rate_type: row.rate_type,
            payment_type: row.payment_type,
            is_refundable: row.is_refundable,
            currency: row.currency,
            base_rate: row.base_rate,
            taxes: row.taxes,
            fees: row.fees,
            available_rooms: row.available_rooms.max(0) as u32,
            cancellation_policy_name: row.cancellation_policy_name,
            cancellation_policy_description: row.cancellation_policy_description,
            free_cancellation_hours: row.free_cancellation_hours,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AddOnRow {
    id: String,
    hotel_id: String,
    rate_plan_id: Option<String>,
    name: String,
    description: Option<String>,
    price: Decimal,
    currency: String,
    pricing: String,
    included: bool,
}

impl From<AddOnRow> for AddOnRecord {
    fn from(row: AddOnRow) -> Self {
        Self {
            id: row.id,
            hotel_id: row.hotel_id,
            rate_plan_id: row.rate_plan_id,
            name: row.name,
            description: row.description,
            price: row.price,
            currency: row.currency,
            pricing: row.pricing,
            included: row.included,
        }
    }
}

const HOTEL_COLUMNS: &str = r#"
    id, slug, name, city, country, address, latitude, longitude, description,
    star_rating, review_score, review_count, currency, amenities, images
"#;

const RATE_PLAN_COLUMNS: &str = r#"
    id, room_type_id, hotel_id, name, board_type, rate_type, payment_type, is_refundable,
    currency, base_rate, taxes, fees, available_rooms,
    cancellation_policy_name, cancellation_policy_description, free_cancellation_hours
"#;

#[async_trait]
impl InventoryRepository for PostgresInventoryRepository {
    async fn list_active_hotels(
        &self,
    ) -> Result<Vec<HotelRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!("SELECT {} FROM hotels WHERE is_active = TRUE ORDER BY name", HOTEL_COLUMNS);
        let rows = sqlx::query_as::<_, HotelRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(HotelRecord::from).collect())
    }

    async fn find_hotel(
        &self,
        id_or_slug: &str,
    ) -> Result<Option<HotelRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!(
            "SELECT {} FROM hotels WHERE is_active = TRUE AND (id = $1 OR slug = $1) LIMIT 1",
            HOTEL_COLUMNS
        );
        let row = sqlx::query_as::<_, HotelRow>(&sql)
            .bind(id_or_slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(HotelRecord::from))
    }

    async fn list_room_types(
        &self,
        hotel_id: &str,
    ) -> Result<Vec<RoomTypeRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, RoomTypeRow>(
            r#"
            SELECT id, hotel_id, name, description, max_adults, max_children, max_occupancy, size_sqm, view
            FROM room_types
            WHERE hotel_id = $1
            ORDER BY name
            "#,
        )
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RoomTypeRecord::from).collect())
    }

    async fn list_rate_plans(
        &self,
        hotel_ids: &[String],
    ) -> Result<Vec<RatePlanRecord>, Box<dyn std::error::Error + Send + Sync>> {
        if hotel_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM rate_plans WHERE is_active = TRUE AND hotel_id = ANY($1) ORDER BY base_rate",
            RATE_PLAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, RatePlanRow>(&sql)
            .bind(hotel_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RatePlanRecord::from).collect())
    }

    async fn find_rate_plan(
        &self,
        id: &str,
    ) -> Result<Option<RatePlanRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let sql = format!("SELECT {} FROM rate_plans WHERE is_active = TRUE AND id = $1", RATE_PLAN_COLUMNS);
        let row = sqlx::query_as::<_, RatePlanRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RatePlanRecord::from))
    }

    async fn list_add_ons(
        &self,
        hotel_id: &str,
    ) -> Result<Vec<AddOnRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, AddOnRow>(
            r#"
            SELECT id, hotel_id, rate_plan_id, name, description, price, currency, pricing, included
            FROM hotel_add_ons
            WHERE hotel_id = $1
            ORDER BY name
            "#,
        )
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AddOnRecord::from).collect())
    }
}
