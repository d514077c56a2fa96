use chrono::NaiveDate;

use tripdesk_core::domain::travel_request::{
    NewTravelRequest, TravelMode, TravelRequest, TravelRequestId, TravelRequestPatch,
    TravelRequestStatus, TripType,
};

use crate::repositories::{RepositoryError, TravelRequestRepository};

/// A one-page placeholder PDF (`%PDF-1.4`) attached to seeded requests past the quote step.
pub const SAMPLE_QUOTE_REFERENCE: &str = "data:application/pdf;base64,JVBERi0xLjQK";

/// Demo requests covering every workflow status, so each dashboard view has content.
const SEED_REQUESTS: &[SeedRequestContract] = &[
    SeedRequestContract {
        employee_name: "Thandi Mokoena",
        start_date: (2024, 9, 2),
        end_date: (2024, 9, 6),
        trip_type: TripType::Return,
        travel_mode: TravelMode::Flight,
        route: Some(("JNB", "O. R. Tambo International Airport", "CPT", "Cape Town International Airport")),
        pickup_location: None,
        dropoff_location: None,
        pickup_time: None,
        passenger_count: 1,
        needs_flights: true,
        needs_accommodation: true,
        needs_transport: false,
        notes: Some("Client workshop, aisle seat please"),
        status: TravelRequestStatus::WaitingForQuote,
    },
    SeedRequestContract {
        employee_name: "Pieter van Wyk",
        start_date: (2024, 9, 10),
        end_date: (2024, 9, 10),
        trip_type: TripType::OneWay,
        travel_mode: TravelMode::Flight,
        route: Some(("DUR", "King Shaka International Airport", "JNB", "O. R. Tambo International Airport")),
        pickup_location: None,
        dropoff_location: None,
        pickup_time: None,
        passenger_count: 2,
        needs_flights: true,
        needs_accommodation: false,
        needs_transport: true,
        notes: None,
        status: TravelRequestStatus::Pending,
    },
    SeedRequestContract {
        employee_name: "Lerato Dlamini",
        start_date: (2024, 8, 19),
        end_date: (2024, 8, 19),
        trip_type: TripType::OneWay,
        travel_mode: TravelMode::Local,
        route: None,
        pickup_location: Some("Sandton Gautrain Station"),
        dropoff_location: Some("Midrand Conference Centre"),
        pickup_time: Some("07:30"),
        passenger_count: 4,
        needs_flights: false,
        needs_accommodation: false,
        needs_transport: true,
        notes: Some("Team offsite"),
        status: TravelRequestStatus::Approved,
    },
    SeedRequestContract {
        employee_name: "Sipho Ndlovu",
        start_date: (2024, 10, 1),
        end_date: (2024, 10, 4),
        trip_type: TripType::MultiLeg,
        travel_mode: TravelMode::Flight,
        route: Some(("CPT", "Cape Town International Airport", "PLZ", "Chief Dawid Stuurman International Airport")),
        pickup_location: None,
        dropoff_location: None,
        pickup_time: None,
        passenger_count: 1,
        needs_flights: true,
        needs_accommodation: true,
        needs_transport: true,
        notes: Some("Continues to East London on day two"),
        status: TravelRequestStatus::Rejected,
    },
];

/// Deterministic demo data for local development and smoke runs.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// Inserts the demo requests that are not present yet and walks each one to its
    /// target status. Running it twice leaves a single copy of every request.
    pub async fn load(repository: &dyn TravelRequestRepository) -> Result<SeedResult, RepositoryError> {
        let existing = repository.list().await?;
        let mut requests = Vec::with_capacity(SEED_REQUESTS.len());

        for seed in SEED_REQUESTS {
            if let Some(found) = existing.iter().find(|record| seed.matches(record)) {
                requests.push(SeededRequest {
                    id: found.id,
                    employee_name: seed.employee_name,
                    status: found.status,
                    created: false,
                });
                continue;
            }

            let created = repository.create(seed.to_new_request()?).await?;
            let stored = seed.advance(repository, created).await?;
            requests.push(SeededRequest {
                id: stored.id,
                employee_name: seed.employee_name,
                status: stored.status,
                created: true,
            });
        }

        Ok(SeedResult { requests })
    }

    /// Checks that every demo request exists with its expected status.
    pub async fn verify(
        repository: &dyn TravelRequestRepository,
    ) -> Result<VerificationResult, RepositoryError> {
        let existing = repository.list().await?;
        let checks = SEED_REQUESTS
            .iter()
            .map(|seed| {
                let present = existing
                    .iter()
                    .any(|record| seed.matches(record) && record.status == seed.status);
                (seed.employee_name, present)
            })
            .collect::<Vec<_>>();

        Ok(VerificationResult { all_present: checks.iter().all(|(_, ok)| *ok), checks })
    }

    pub fn expected_count() -> usize {
        SEED_REQUESTS.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedRequestContract {
    employee_name: &'static str,
    start_date: (i32, u32, u32),
    end_date: (i32, u32, u32),
    trip_type: TripType,
    travel_mode: TravelMode,
    route: Option<(&'static str, &'static str, &'static str, &'static str)>,
    pickup_location: Option<&'static str>,
    dropoff_location: Option<&'static str>,
    pickup_time: Option<&'static str>,
    passenger_count: u32,
    needs_flights: bool,
    needs_accommodation: bool,
    needs_transport: bool,
    notes: Option<&'static str>,
    status: TravelRequestStatus,
}

impl SeedRequestContract {
    fn matches(&self, record: &TravelRequest) -> bool {
        record.employee_name == self.employee_name
            && Self::date(self.start_date).is_ok_and(|start| record.start_date == start)
    }

    fn date((year, month, day): (i32, u32, u32)) -> Result<NaiveDate, RepositoryError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid seed date {year}-{month}-{day}")))
    }

    fn to_new_request(&self) -> Result<NewTravelRequest, RepositoryError> {
        let owned = |value: Option<&str>| value.map(str::to_string);
        let (from_code, from_name, to_code, to_name) = match self.route {
            Some((fc, fname, tc, tname)) => (Some(fc), Some(fname), Some(tc), Some(tname)),
            None => (None, None, None, None),
        };

        Ok(NewTravelRequest {
            employee_name: self.employee_name.to_string(),
            start_date: Self::date(self.start_date)?,
            end_date: Self::date(self.end_date)?,
            trip_type: self.trip_type,
            travel_mode: self.travel_mode,
            from_airport_code: owned(from_code),
            from_airport_name: owned(from_name),
            to_airport_code: owned(to_code),
            to_airport_name: owned(to_name),
            pickup_location: owned(self.pickup_location),
            dropoff_location: owned(self.dropoff_location),
            pickup_time: owned(self.pickup_time),
            return_pickup_time: None,
            passenger_count: self.passenger_count,
            needs_flights: self.needs_flights,
            needs_accommodation: self.needs_accommodation,
            needs_transport: self.needs_transport,
            notes: owned(self.notes),
        })
    }

    /// Attaches the sample quote and moves the request along the normal path.
    async fn advance(
        &self,
        repository: &dyn TravelRequestRepository,
        created: TravelRequest,
    ) -> Result<TravelRequest, RepositoryError> {
        if self.status == TravelRequestStatus::WaitingForQuote {
            return Ok(created);
        }

        let id = created.id;
        repository.update(id, TravelRequestPatch::quote_reference(SAMPLE_QUOTE_REFERENCE)).await?;
        let mut stored =
            repository.update(id, TravelRequestPatch::status(TravelRequestStatus::Pending)).await?;
        if self.status != TravelRequestStatus::Pending {
            stored = repository.update(id, TravelRequestPatch::status(self.status)).await?;
        }
        Ok(stored)
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub requests: Vec<SeededRequest>,
}

impl SeedResult {
    pub fn created_count(&self) -> usize {
        self.requests.iter().filter(|request| request.created).count()
    }
}

#[derive(Debug)]
pub struct SeededRequest {
    pub id: TravelRequestId,
    pub employee_name: &'static str,
    pub status: TravelRequestStatus,
    pub created: bool,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
