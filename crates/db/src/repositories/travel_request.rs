use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use tripdesk_core::domain::travel_request::{
    NewTravelRequest, TravelMode, TravelRequest, TravelRequestId, TravelRequestPatch,
    TravelRequestStatus, TripType,
};

use super::{RepositoryError, TravelRequestRepository};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = "id, employee_name, start_date, end_date, trip_type, travel_mode,
    from_airport_code, from_airport_name, to_airport_code, to_airport_name,
    pickup_location, dropoff_location, pickup_time, return_pickup_time,
    passenger_count, needs_flights, needs_accommodation, needs_transport,
    notes, quote_pdf_url, status, created_at, updated_at";

pub struct SqlTravelRequestRepository {
    pool: DbPool,
}

impl SqlTravelRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn parse_date(column: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| RepositoryError::Decode(format!("{column}: `{value}` ({e})")))
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: `{value}` ({e})")))
}

fn parse_enum<T>(column: &str, value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<TravelRequest, RepositoryError> {
    let start_date: String = decode(row, "start_date")?;
    let end_date: String = decode(row, "end_date")?;
    let trip_type: String = decode(row, "trip_type")?;
    let travel_mode: String = decode(row, "travel_mode")?;
    let status: String = decode(row, "status")?;
    let passenger_count: i64 = decode(row, "passenger_count")?;
    let created_at: String = decode(row, "created_at")?;
    let updated_at: String = decode(row, "updated_at")?;

    Ok(TravelRequest {
        id: TravelRequestId(decode(row, "id")?),
        employee_name: decode(row, "employee_name")?,
        start_date: parse_date("start_date", &start_date)?,
        end_date: parse_date("end_date", &end_date)?,
        trip_type: parse_enum::<TripType>("trip_type", &trip_type)?,
        travel_mode: parse_enum::<TravelMode>("travel_mode", &travel_mode)?,
        from_airport_code: decode(row, "from_airport_code")?,
        from_airport_name: decode(row, "from_airport_name")?,
        to_airport_code: decode(row, "to_airport_code")?,
        to_airport_name: decode(row, "to_airport_name")?,
        pickup_location: decode(row, "pickup_location")?,
        dropoff_location: decode(row, "dropoff_location")?,
        pickup_time: decode(row, "pickup_time")?,
        return_pickup_time: decode(row, "return_pickup_time")?,
        passenger_count: u32::try_from(passenger_count).map_err(|_| {
            RepositoryError::Decode(format!("passenger_count: {passenger_count} out of range"))
        })?,
        needs_flights: decode(row, "needs_flights")?,
        needs_accommodation: decode(row, "needs_accommodation")?,
        needs_transport: decode(row, "needs_transport")?,
        notes: decode(row, "notes")?,
        quote_pdf_url: decode(row, "quote_pdf_url")?,
        status: parse_enum::<TravelRequestStatus>("status", &status)?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait::async_trait]
impl TravelRequestRepository for SqlTravelRequestRepository {
    async fn create(&self, request: NewTravelRequest) -> Result<TravelRequest, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "INSERT INTO travel_requests
                (employee_name, start_date, end_date, trip_type, travel_mode,
                 from_airport_code, from_airport_name, to_airport_code, to_airport_name,
                 pickup_location, dropoff_location, pickup_time, return_pickup_time,
                 passenger_count, needs_flights, needs_accommodation, needs_transport,
                 notes, quote_pdf_url, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(&request.employee_name)
            .bind(request.start_date.format(DATE_FORMAT).to_string())
            .bind(request.end_date.format(DATE_FORMAT).to_string())
            .bind(request.trip_type.as_str())
            .bind(request.travel_mode.as_str())
            .bind(&request.from_airport_code)
            .bind(&request.from_airport_name)
            .bind(&request.to_airport_code)
            .bind(&request.to_airport_name)
            .bind(&request.pickup_location)
            .bind(&request.dropoff_location)
            .bind(&request.pickup_time)
            .bind(&request.return_pickup_time)
            .bind(i64::from(request.passenger_count))
            .bind(request.needs_flights)
            .bind(request.needs_accommodation)
            .bind(request.needs_transport)
            .bind(&request.notes)
            .bind(TravelRequestStatus::WaitingForQuote.as_str())
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        row_to_request(&row)
    }

    async fn list(&self) -> Result<Vec<TravelRequest>, RepositoryError> {
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM travel_requests ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(
        &self,
        id: TravelRequestId,
    ) -> Result<Option<TravelRequest>, RepositoryError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM travel_requests WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        id: TravelRequestId,
        patch: TravelRequestPatch,
    ) -> Result<TravelRequest, RepositoryError> {
        let sql = format!(
            "UPDATE travel_requests
             SET status = COALESCE(?, status),
                 quote_pdf_url = COALESCE(?, quote_pdf_url),
                 updated_at = ?
             WHERE id = ?
             RETURNING {SELECT_COLUMNS}"
        );

        let row = sqlx::query(&sql)
            .bind(patch.status.map(TravelRequestStatus::as_str))
            .bind(&patch.quote_pdf_url)
            .bind(Utc::now().to_rfc3339())
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => row_to_request(r),
            None => Err(RepositoryError::NotFound(id)),
        }
    }
}
