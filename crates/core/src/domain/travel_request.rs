use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TravelRequestId(pub i64);

impl fmt::Display for TravelRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TravelRequestId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<i64>().map(Self).map_err(|_| DomainError::InvalidField {
            field: "id",
            reason: format!("`{value}` is not a numeric request id"),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelRequestStatus {
    WaitingForQuote,
    Pending,
    Approved,
    Rejected,
}

impl TravelRequestStatus {
    pub const ALL: [Self; 4] = [Self::WaitingForQuote, Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaitingForQuote => "WAITING_FOR_QUOTE",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for TravelRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelRequestStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|status| status.as_str() == value.trim()).ok_or_else(|| {
            DomainError::InvalidField {
                field: "status",
                reason: format!(
                    "`{value}` is not one of WAITING_FOR_QUOTE|PENDING|APPROVED|REJECTED"
                ),
            }
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    #[default]
    OneWay,
    Return,
    MultiLeg,
}

impl TripType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneWay => "ONE_WAY",
            Self::Return => "RETURN",
            Self::MultiLeg => "MULTI_LEG",
        }
    }
}

impl FromStr for TripType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ONE_WAY" => Ok(Self::OneWay),
            "RETURN" => Ok(Self::Return),
            "MULTI_LEG" => Ok(Self::MultiLeg),
            other => Err(DomainError::InvalidField {
                field: "tripType",
                reason: format!("`{other}` is not one of ONE_WAY|RETURN|MULTI_LEG"),
            }),
        }
    }
}

/// How the traveller gets there. Local trips carry pickup details instead of airports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    #[default]
    Flight,
    Local,
}

impl TravelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "FLIGHT",
            Self::Local => "LOCAL",
        }
    }
}

impl FromStr for TravelMode {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "FLIGHT" => Ok(Self::Flight),
            "LOCAL" => Ok(Self::Local),
            other => Err(DomainError::InvalidField {
                field: "travelMode",
                reason: format!("`{other}` is not one of FLIGHT|LOCAL"),
            }),
        }
    }
}

/// A stored travel request as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelRequest {
    pub id: TravelRequestId,
    pub employee_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trip_type: TripType,
    pub travel_mode: TravelMode,
    pub from_airport_code: Option<String>,
    pub from_airport_name: Option<String>,
    pub to_airport_code: Option<String>,
    pub to_airport_name: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: Option<String>,
    pub return_pickup_time: Option<String>,
    pub passenger_count: u32,
    pub needs_flights: bool,
    pub needs_accommodation: bool,
    pub needs_transport: bool,
    pub notes: Option<String>,
    pub quote_pdf_url: Option<String>,
    pub status: TravelRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TravelRequest {
    /// Builds the stored record for a freshly assigned id.
    pub fn from_new(id: TravelRequestId, new: NewTravelRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            employee_name: new.employee_name,
            start_date: new.start_date,
            end_date: new.end_date,
            trip_type: new.trip_type,
            travel_mode: new.travel_mode,
            from_airport_code: new.from_airport_code,
            from_airport_name: new.from_airport_name,
            to_airport_code: new.to_airport_code,
            to_airport_name: new.to_airport_name,
            pickup_location: new.pickup_location,
            dropoff_location: new.dropoff_location,
            pickup_time: new.pickup_time,
            return_pickup_time: new.return_pickup_time,
            passenger_count: new.passenger_count,
            needs_flights: new.needs_flights,
            needs_accommodation: new.needs_accommodation,
            needs_transport: new.needs_transport,
            notes: new.notes,
            quote_pdf_url: None,
            status: TravelRequestStatus::WaitingForQuote,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_quote(&self) -> bool {
        self.quote_pdf_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// `JNB → CPT` for flights with both airports, `Local Travel` otherwise.
    pub fn route_label(&self) -> String {
        match (&self.from_airport_code, &self.to_airport_code) {
            (Some(from), Some(to)) if self.travel_mode == TravelMode::Flight => {
                format!("{from} → {to}")
            }
            _ => "Local Travel".to_string(),
        }
    }

    pub fn service_labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.needs_flights {
            labels.push("Flights");
        }
        if self.needs_accommodation {
            labels.push("Accommodation");
        }
        if self.needs_transport {
            labels.push("Airport transport");
        }
        labels
    }
}

/// Validated input for the request store. Produced from a [`TravelRequestSubmission`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTravelRequest {
    pub employee_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trip_type: TripType,
    pub travel_mode: TravelMode,
    pub from_airport_code: Option<String>,
    pub from_airport_name: Option<String>,
    pub to_airport_code: Option<String>,
    pub to_airport_name: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: Option<String>,
    pub return_pickup_time: Option<String>,
    pub passenger_count: u32,
    pub needs_flights: bool,
    pub needs_accommodation: bool,
    pub needs_transport: bool,
    pub notes: Option<String>,
}

impl NewTravelRequest {
    /// Minimal request with defaults for everything but the required fields.
    pub fn minimal(employee_name: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            employee_name: employee_name.into(),
            start_date,
            end_date: start_date,
            trip_type: TripType::OneWay,
            travel_mode: TravelMode::Flight,
            from_airport_code: None,
            from_airport_name: None,
            to_airport_code: None,
            to_airport_name: None,
            pickup_location: None,
            dropoff_location: None,
            pickup_time: None,
            return_pickup_time: None,
            passenger_count: 1,
            needs_flights: false,
            needs_accommodation: false,
            needs_transport: false,
            notes: None,
        }
    }
}

/// Wire shape of `POST /api/requests`. Everything is optional so that missing
/// required fields surface as a domain error rather than a parse failure.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelRequestSubmission {
    pub employee_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub trip_type: Option<String>,
    pub travel_mode: Option<String>,
    pub from_airport_code: Option<String>,
    pub from_airport_name: Option<String>,
    pub to_airport_code: Option<String>,
    pub to_airport_name: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: Option<String>,
    pub return_pickup_time: Option<String>,
    /// JSON numbers of either kind; fractions are truncated.
    pub passenger_count: Option<f64>,
    /// `null` reads as `false`.
    pub needs_flights: Option<bool>,
    pub needs_accommodation: Option<bool>,
    pub needs_transport: Option<bool>,
    pub notes: Option<String>,
}

impl TravelRequestSubmission {
    pub fn into_new_request(self) -> Result<NewTravelRequest, DomainError> {
        let employee_name = non_blank(self.employee_name);
        let start_date = non_blank(self.start_date);
        let (Some(employee_name), Some(start_date)) = (employee_name, start_date) else {
            return Err(DomainError::MissingRequiredFields);
        };

        let start_date = parse_date("startDate", &start_date)?;
        let trip_type = match non_blank(self.trip_type) {
            Some(value) => value.parse::<TripType>()?,
            None => TripType::default(),
        };
        let travel_mode = match non_blank(self.travel_mode) {
            Some(value) => value.parse::<TravelMode>()?,
            None => TravelMode::default(),
        };
        let end_date = match non_blank(self.end_date) {
            Some(end_date) if trip_type != TripType::OneWay => parse_date("endDate", &end_date)?,
            _ => start_date,
        };

        let passenger_count = passenger_count(self.passenger_count)?;

        Ok(NewTravelRequest {
            employee_name,
            start_date,
            end_date,
            trip_type,
            travel_mode,
            from_airport_code: non_blank(self.from_airport_code),
            from_airport_name: non_blank(self.from_airport_name),
            to_airport_code: non_blank(self.to_airport_code),
            to_airport_name: non_blank(self.to_airport_name),
            pickup_location: non_blank(self.pickup_location),
            dropoff_location: non_blank(self.dropoff_location),
            pickup_time: non_blank(self.pickup_time),
            return_pickup_time: non_blank(self.return_pickup_time),
            passenger_count,
            needs_flights: self.needs_flights.unwrap_or(false),
            needs_accommodation: self.needs_accommodation.unwrap_or(false),
            needs_transport: self.needs_transport.unwrap_or(false),
            notes: non_blank(self.notes),
        })
    }
}

/// Fields a caller may merge into an existing record. Unset fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TravelRequestPatch {
    pub status: Option<TravelRequestStatus>,
    pub quote_pdf_url: Option<String>,
}

impl TravelRequestPatch {
    pub fn status(status: TravelRequestStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn quote_reference(reference: impl Into<String>) -> Self {
        Self { quote_pdf_url: Some(reference.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.quote_pdf_url.is_none()
    }

    pub fn apply_to(&self, request: &mut TravelRequest, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            crate::workflow::apply_status(request, status, now);
        }
        if let Some(reference) = &self.quote_pdf_url {
            request.quote_pdf_url = Some(reference.clone());
        }
        request.updated_at = now;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

/// Absent means one passenger; anything below one is raised to one.
fn passenger_count(value: Option<f64>) -> Result<u32, DomainError> {
    match value {
        None => Ok(1),
        Some(count) if count.is_finite() => Ok(count.trunc().clamp(1.0, f64::from(u32::MAX)) as u32),
        Some(count) => Err(DomainError::InvalidField {
            field: "passengerCount",
            reason: format!("`{count}` is not a number of passengers"),
        }),
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|error| DomainError::InvalidField {
        field,
        reason: format!("`{value}` is not a YYYY-MM-DD date ({error})"),
    })
}
