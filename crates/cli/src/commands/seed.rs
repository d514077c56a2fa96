use crate::commands::{load_config, migrated_pool, runtime, CommandResult, StepError};
use tripdesk_db::repositories::SqlTravelRequestRepository;
use tripdesk_db::{DemoSeedDataset, SeededRequest};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = migrated_pool(&config).await?;
        let repository = SqlTravelRequestRepository::new(pool.clone());

        let outcome: Result<Vec<SeededRequest>, StepError> = async {
            let seed_result = DemoSeedDataset::load(&repository)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            let verification = DemoSeedDataset::verify(&repository)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

            if verification.all_present {
                Ok(seed_result.requests)
            } else {
                let failed = failed_checks(&verification.checks);
                Err(("seed_verification", verification_message(&failed), 6u8))
            }
        }
        .await;

        pool.close().await;
        outcome
    });

    match result {
        Ok(requests) => CommandResult::success("seed", summary(&requests)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn failed_checks<'a>(checks: &[(&'a str, bool)]) -> Vec<&'a str> {
    checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect()
}

fn verification_message(failed: &[&str]) -> String {
    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for: {}", failed.join(", "))
    }
}

fn summary(requests: &[SeededRequest]) -> String {
    let created = requests.iter().filter(|request| request.created).count();
    let lines = requests
        .iter()
        .map(|request| {
            let marker = if request.created { "created" } else { "present" };
            format!("  - #{} {} [{}] ({marker})", request.id, request.employee_name, request.status)
        })
        .collect::<Vec<_>>();

    format!(
        "demo travel requests ready ({created} created, {} already present):\n{}",
        requests.len() - created,
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::{failed_checks, verification_message};

    #[test]
    fn verification_message_names_failed_requests() {
        let checks = [("Thandi Mokoena", true), ("Pieter van Wyk", false), ("Sipho Ndlovu", false)];

        let message = verification_message(&failed_checks(&checks));

        assert_eq!(message, "Seed verification failed for: Pieter van Wyk, Sipho Ndlovu");
    }

    #[test]
    fn verification_message_falls_back_to_generic_when_nothing_failed() {
        let checks = [("Thandi Mokoena", true)];

        assert_eq!(verification_message(&failed_checks(&checks)), "Some seed data failed to load");
    }
}
