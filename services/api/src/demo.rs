use crate::infra::{InMemoryHiringRepository, InMemoryNotificationPublisher};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Args;
use driver_hiring::config::{AppConfig, HiringConfig};
use driver_hiring::error::AppError;
use driver_hiring::workflows::hiring::{
    detect_gaps, write_applications_csv, AddressRecord, ApplicantProfile, ApplicationSubmission,
    AuditContext, Clock, CompanyId, ConsentKind, ConsentRecord, Consents, DocumentPhotos,
    DriverStatus, EmploymentRecord, FixedClock, GapAcknowledgement, GapReport, HiringService,
    HistoryKind, MonthRange, SignatureRecord, SystemClock, YearMonth,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct GapCheckArgs {
    /// JSON file holding an array of {from_month, from_year, to_month, to_year} objects
    #[arg(long)]
    pub(crate) intervals: PathBuf,
    /// Which history the intervals describe: employment or residency
    #[arg(long, value_parser = parse_kind, default_value = "employment")]
    pub(crate) kind: HistoryKind,
    /// Override the configured lookback window, in months
    #[arg(long)]
    pub(crate) months: Option<u32>,
    /// Month the lookback window ends in (YYYY-MM). Defaults to the current month.
    #[arg(long, value_parser = crate::infra::parse_month)]
    pub(crate) today: Option<YearMonth>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the demo runs on (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Route the applicant through the optional PSP review stage.
    #[arg(long)]
    pub(crate) require_psp_review: bool,
    /// Print the company CSV export at the end of the demo.
    #[arg(long)]
    pub(crate) export_csv: bool,
}

fn parse_kind(raw: &str) -> Result<HistoryKind, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "employment" | "jobs" => Ok(HistoryKind::Employment),
        "residency" | "addresses" => Ok(HistoryKind::Residency),
        other => Err(format!(
            "unknown history kind '{other}' (expected employment or residency)"
        )),
    }
}

pub(crate) fn run_gap_check(args: GapCheckArgs) -> Result<(), AppError> {
    let GapCheckArgs {
        intervals,
        kind,
        months,
        today,
    } = args;

    let raw = std::fs::read_to_string(&intervals)?;
    let ranges: Vec<MonthRange> = serde_json::from_str(&raw)?;
    let required = match months {
        Some(months) => months,
        None => AppConfig::load()?
            .hiring
            .lookback_policy()
            .required_months(kind),
    };
    let today = today.unwrap_or_else(|| SystemClock.current_month());

    let report = detect_gaps(&ranges, required, today)?;
    render_gap_report(kind, &report);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        require_psp_review,
        export_csv,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let now = today
        .and_hms_opt(12, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now);
    let clock = Arc::new(FixedClock(now));

    let repository = Arc::new(InMemoryHiringRepository::default());
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let config = HiringConfig {
        require_psp_review,
        ..HiringConfig::default()
    };
    let service = HiringService::with_clock(
        repository,
        notifications.clone(),
        config,
        clock.clone(),
    );

    println!("Driver hiring demo ({today})");

    let mut submission = demo_submission(clock.current_month());
    let employment = service.check_employment_history(&submission.jobs)?;
    let residency = service.check_residency_history(&submission.addresses)?;
    render_gap_report(HistoryKind::Employment, &employment);
    render_gap_report(HistoryKind::Residency, &residency);
    submission.acknowledged_gaps = GapAcknowledgement {
        employment: employment.gap_detected,
        residency: residency.gap_detected,
    };
    if employment.gap_detected {
        println!("  Applicant acknowledged the employment gap");
    }

    let record = match service.submit(submission, &AuditContext::default()) {
        Ok(record) => record,
        Err(err) => {
            println!("Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "\nSubmitted {} for {} ({})",
        record.id.0,
        record.profile.full_name(),
        record.status
    );

    let operator = AuditContext::operator("ops-demo", "safety@demo-freight.example");
    println!("\nAutomatic status progression");
    loop {
        let outcome = service.process_status_transition(&record.id, None, &operator);
        if !outcome.success {
            println!("  stop: {}", outcome.message);
            break;
        }
        println!(
            "  {} -> {} ({})",
            outcome
                .previous_status
                .map(|status| status.label())
                .unwrap_or("?"),
            outcome.new_status,
            outcome.message
        );
    }

    let hire = service.hire_driver(&record.id, &operator);
    println!("\nHire: {}", hire.message);
    let Some(driver_id) = hire.driver_id else {
        return Ok(());
    };

    let driver = service.set_driver_status(
        &driver_id,
        DriverStatus::OutOfDuty,
        &operator.clone().with_notes("Awaiting orientation"),
    )?;
    println!(
        "  Driver {} ({} {}), license {} {}, status {}",
        driver.id.0,
        driver.first_name,
        driver.last_name,
        driver.license_state,
        driver.license_number,
        driver.status.label()
    );

    let stored = service.get(&record.id)?;
    println!("\nApplication audit trail");
    for entry in &stored.logs {
        let change = entry
            .status_change()
            .map(|change| format!(" {} -> {}", change.from, change.to))
            .unwrap_or_default();
        println!(
            "  {} {}{} {}",
            entry.id,
            entry.action.label(),
            change,
            entry.reason().unwrap_or("")
        );
    }
    println!(
        "  Background check: {} ({} stage results)",
        stored.background_check.status.label(),
        stored.background_check.results.len()
    );

    let events = notifications.events();
    if events.is_empty() {
        println!("\nNotifications: none queued");
    } else {
        println!("\nNotifications");
        for event in events {
            println!("  - template={} -> {}", event.template, event.recipient);
        }
    }

    if export_csv {
        println!("\nCompany export");
        let records = service.applications_for_company(&stored.company_id)?;
        write_applications_csv(std::io::stdout().lock(), &records)?;
    }

    Ok(())
}

fn render_gap_report(kind: HistoryKind, report: &GapReport) {
    println!(
        "{} history: {} of {} months covered",
        kind.label(),
        report.total_covered_months,
        report.required_months
    );
    if !report.gap_detected {
        println!("  no gaps");
        return;
    }
    if report.periods.is_empty() {
        println!("  history is shorter than the lookback window");
    }
    for period in &report.periods {
        println!(
            "  gap {} .. {} ({} months)",
            period.from,
            period.to,
            period.months()
        );
    }
}

fn span(from: YearMonth, to: YearMonth) -> MonthRange {
    MonthRange::new((from.year, from.month), (to.year, to.month))
}

fn demo_submission(current: YearMonth) -> ApplicationSubmission {
    let mut consents = Consents::default();
    for kind in ConsentKind::ordered() {
        *consents.get_mut(kind) = ConsentRecord {
            consent_given: true,
            signature: SignatureRecord {
                uploaded: true,
                storage_key: Some(format!("signatures/demo/{}.png", kind.label())),
                ..SignatureRecord::default()
            },
        };
    }

    ApplicationSubmission {
        company_id: CompanyId("demo-freight".to_string()),
        profile: ApplicantProfile {
            first_name: "Sam".to_string(),
            middle_name: None,
            last_name: "Okafor".to_string(),
            email: "sam.okafor@example.com".to_string(),
            phone: "402-555-0117".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 6, 30),
            license_number: "NE4455667".to_string(),
            license_state: "NE".to_string(),
            license_class: Some("A".to_string()),
            license_expiration: None,
        },
        addresses: vec![AddressRecord {
            street: "77 Dodge St".to_string(),
            city: "Omaha".to_string(),
            state: "NE".to_string(),
            postal_code: "68102".to_string(),
            period: span(current.sub_months(60), current),
        }],
        jobs: vec![
            EmploymentRecord {
                employer_name: "Platte Valley Carriers".to_string(),
                position: "Regional Driver".to_string(),
                contact_phone: Some("402-555-0100".to_string()),
                reason_for_leaving: None,
                subject_to_fmcsa: true,
                period: span(current.sub_months(14), current),
            },
            EmploymentRecord {
                employer_name: "Heartland Grain Co-op".to_string(),
                position: "Yard Driver".to_string(),
                contact_phone: None,
                reason_for_leaving: Some("Seasonal layoff".to_string()),
                subject_to_fmcsa: false,
                period: span(current.sub_months(40), current.sub_months(19)),
            },
        ],
        documents: DocumentPhotos {
            license_front: Some("docs/demo/license-front.jpg".to_string()),
            license_back: Some("docs/demo/license-back.jpg".to_string()),
            medical_card: None,
        },
        consents,
        acknowledged_gaps: GapAcknowledgement::default(),
    }
}
