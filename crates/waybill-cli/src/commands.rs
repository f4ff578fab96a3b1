//! Command handlers

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::{Cli, Commands};
use crate::output::{
    output_breakdown, output_subdetails, output_update, output_waybill, output_waybill_list,
};
use waybill_app::app::SyncService;
use waybill_app::config::Config;
use waybill_app::polling::watch_approval;
use waybill_app::repository::open_waybill_repo;
use waybill_app::session::check_truck_cbm;
use waybill_app::{AllocationContext, NewDrop, SessionUpdate, WaybillSession};
use waybill_domain::model::{FieldChange, Shipper, Waybill};
use waybill_domain::repository::WaybillRepository;
use waybill_domain::service::AmountMode;
use waybill_infra::api::{ApprovalAction, ApprovalRequest, ApprovalStatus, HttpWaybillApi};
use waybill_infra::document_loader::load_waybill_document;
use waybill_infra::drop_csv::load_drops_from_csv;
use waybill_infra::excel::export_summary_to_excel;
use waybill_infra::persistence::FileWaybillRepository;
use waybill_types::{ApiError, Error, OutputFormat, Result, ValidationError};

pub fn execute(cli: Cli) -> Result<()> {
    // Load config
    let mut config = Config::load()?;

    // Override from CLI args
    if cli.store_dir.is_some() {
        config.store_dir = cli.store_dir.clone();
    }
    if cli.api_url.is_some() {
        config.api_base_url = cli.api_url.clone();
    }
    let output_format = cli.format.unwrap_or(config.output_format);

    if let Commands::Config {
        show,
        set_api_url,
        set_additional_rate,
        set_amount_mode,
        set_output,
        set_store_dir,
        reset,
    } = &cli.command
    {
        return cmd_config(
            *show,
            set_api_url.clone(),
            *set_additional_rate,
            *set_amount_mode,
            *set_output,
            set_store_dir.clone(),
            *reset,
        );
    }

    config.validate()?;
    let repo = open_waybill_repo(&config)?;

    match &cli.command {
        Commands::New {
            waybill,
            truck_cbm,
            rate,
            mode,
            shipper,
        } => cmd_new(
            &config,
            &repo,
            output_format,
            waybill,
            *truck_cbm,
            *rate,
            *mode,
            shipper.clone(),
        ),

        Commands::Show { waybill } => {
            let waybill = repo.get(waybill)?;
            let breakdown = waybill.rate_breakdown(config.additional_rate);
            output_waybill(output_format, &waybill, &breakdown)
        }

        Commands::List => output_waybill_list(output_format, &repo.find_all()?),

        Commands::AddDrop {
            waybill,
            consignee,
            cbm,
            split,
            payload,
        } => edit_waybill(&config, &repo, output_format, waybill, |session| {
            let mut new_drop = NewDrop::new(consignee.clone(), *cbm);
            new_drop.split_index = *split;
            new_drop.payload_index = *payload;
            let update = session.on_add_drop(new_drop)?;
            Ok((format!("Added drop {}", consignee), update))
        }),

        Commands::Set {
            waybill,
            drop,
            changes,
        } => {
            let changes = changes
                .iter()
                .map(|c| FieldChange::parse(c))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            edit_waybill(&config, &repo, output_format, waybill, |session| {
                let drop_id = resolve_drop(session.waybill(), drop)?;
                let mut update = session.snapshot();
                for change in &changes {
                    update = session.apply(drop_id, change.clone())?;
                }
                Ok((format!("Updated drop {}", drop), update))
            })
        }

        Commands::DeleteDrop { waybill, drop } => {
            edit_waybill(&config, &repo, output_format, waybill, |session| {
                let drop_id = resolve_drop(session.waybill(), drop)?;
                let update = session.on_delete_drop(drop_id)?;
                Ok((format!("Deleted drop {}", drop), update))
            })
        }

        Commands::Rate { waybill, rate } => {
            edit_waybill(&config, &repo, output_format, waybill, |session| {
                let update = session.on_rate_change(*rate)?;
                Ok((format!("Rate set to {:.2}", rate), update))
            })
        }

        Commands::Truck { waybill, truck_cbm } => {
            edit_waybill(&config, &repo, output_format, waybill, |session| {
                let update = session.on_truck_cbm_change(*truck_cbm)?;
                Ok((format!("Truck capacity set to {:.2} CBM", truck_cbm), update))
            })
        }

        Commands::Normalize { waybill } => {
            edit_waybill(&config, &repo, output_format, waybill, |session| {
                let update = session.normalize()?;
                Ok(("Percentages normalized".to_string(), update))
            })
        }

        Commands::RoundEntity { waybill, entity } => {
            edit_waybill(&config, &repo, output_format, waybill, |session| {
                let update = session.round_entity(entity)?;
                Ok((format!("Entity {} rounded", entity), update))
            })
        }

        Commands::ResetEntity { waybill, entity } => {
            edit_waybill(&config, &repo, output_format, waybill, |session| {
                let update = session.reset_entity(entity)?;
                Ok((format!("Entity {} reset", entity), update))
            })
        }

        Commands::Import {
            file,
            waybill,
            dry_run,
        } => cmd_import(
            &config,
            &repo,
            output_format,
            file,
            waybill.as_deref(),
            *dry_run,
        ),

        Commands::Export { waybill, output } => cmd_export(&config, &repo, waybill, output.clone()),

        Commands::Fee {
            waybill,
            rate_per_drop,
            remote,
        } => {
            let waybill = repo.get(waybill)?;
            let breakdown = if *remote {
                let service = sync_service(&config)?;
                runtime()?.block_on(async {
                    let rate_per_drop = match rate_per_drop {
                        Some(rate) => *rate,
                        None => service.rate_per_drop(config.additional_rate).await?,
                    };
                    service.rate_breakdown(&waybill, rate_per_drop).await
                })?
            } else {
                waybill.rate_breakdown(rate_per_drop.unwrap_or(config.additional_rate))
            };
            output_breakdown(output_format, &breakdown)
        }

        Commands::Pull { waybill, truck_cbm } => {
            check_truck_cbm(*truck_cbm)?;
            let service = sync_service(&config)?;
            let pulled = runtime()?.block_on(service.pull(waybill, *truck_cbm))?;
            let session = WaybillSession::from_waybill(pulled, allocation_context(&config));
            let waybill = session.into_waybill();
            repo.save(&waybill)?;
            eprintln!("Pulled {} drops for {}", waybill.drops.len(), waybill.waybill_number);
            output_waybill(
                output_format,
                &waybill,
                &waybill.rate_breakdown(config.additional_rate),
            )
        }

        Commands::Push { waybill } => {
            let waybill = repo.get(waybill)?;
            let service = sync_service(&config)?;
            let report = runtime()?.block_on(service.push(&waybill))?;
            println!(
                "Pushed {} consignees and {} entity summaries for {}",
                report.consignees, report.summaries, waybill.waybill_number
            );
            Ok(())
        }

        Commands::Approval {
            waybill,
            drop,
            action,
            reason,
            reference,
            no_wait,
        } => cmd_approval(
            &config,
            &repo,
            waybill,
            drop.as_deref(),
            (*action).into(),
            reason.clone(),
            reference.clone(),
            *no_wait,
        ),

        Commands::Subdetails { waybill } => cmd_subdetails(&config, output_format, waybill),

        Commands::Config { .. } => Ok(()),
    }
}

fn allocation_context(config: &Config) -> AllocationContext {
    AllocationContext {
        rate_per_drop: config.additional_rate,
        amount_mode: config.amount_mode,
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn sync_service(config: &Config) -> Result<SyncService<HttpWaybillApi>> {
    let api = HttpWaybillApi::new(config.api_settings()?)?;
    Ok(SyncService::new(Arc::new(api)))
}

/// Load a stored waybill, run one session edit, save and print the result
fn edit_waybill<F>(
    config: &Config,
    repo: &FileWaybillRepository,
    output_format: OutputFormat,
    waybill_number: &str,
    edit: F,
) -> Result<()>
where
    F: FnOnce(&mut WaybillSession) -> Result<(String, SessionUpdate)>,
{
    let waybill = repo.get(waybill_number)?;
    let mut session = WaybillSession::from_waybill(waybill, allocation_context(config));
    let (message, update) = edit(&mut session)?;
    repo.save(session.waybill())?;
    debug!(waybill = waybill_number, "waybill saved");
    output_update(output_format, &message, &update)
}

/// Find a drop by id, exact consignee name or 1-based position
fn resolve_drop(waybill: &Waybill, selector: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(selector) {
        if waybill.find_drop(id).is_some() {
            return Ok(id);
        }
    }
    if let Some(drop) = waybill
        .drops
        .iter()
        .find(|d| d.consignee_name.eq_ignore_ascii_case(selector.trim()))
    {
        return Ok(drop.id);
    }
    if let Ok(position) = selector.trim().parse::<usize>() {
        if let Some(drop) = position.checked_sub(1).and_then(|i| waybill.drops.get(i)) {
            return Ok(drop.id);
        }
    }
    Err(ValidationError::DropNotFound(selector.to_string()).into())
}

#[allow(clippy::too_many_arguments)]
fn cmd_new(
    config: &Config,
    repo: &FileWaybillRepository,
    output_format: OutputFormat,
    waybill_number: &str,
    truck_cbm: f64,
    rate: Option<f64>,
    mode: Option<AmountMode>,
    shipper: Option<String>,
) -> Result<()> {
    if repo.find_by_number(waybill_number)?.is_some() {
        return Err(ValidationError::InvalidValue {
            field: "waybill".to_string(),
            value: format!("{} already exists", waybill_number),
        }
        .into());
    }
    check_truck_cbm(truck_cbm)?;

    let mut context = allocation_context(config);
    if let Some(mode) = mode {
        context.amount_mode = mode;
    }
    let mut session = WaybillSession::new(waybill_number, truck_cbm, context);
    if let Some(rate) = rate {
        session.on_rate_change(rate)?;
    }
    let mut waybill = session.into_waybill();
    waybill.shipper = shipper.map(|name| Shipper {
        name,
        ..Shipper::default()
    });
    repo.save(&waybill)?;
    info!(waybill = waybill_number, truck_cbm, "waybill created");

    output_waybill(
        output_format,
        &waybill,
        &waybill.rate_breakdown(config.additional_rate),
    )
}

fn cmd_import(
    config: &Config,
    repo: &FileWaybillRepository,
    output_format: OutputFormat,
    file: &Path,
    target: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    if !file.exists() {
        return Err(Error::Import(format!("File not found: {}", file.display())));
    }

    let is_csv = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let session = if is_csv {
        let number = target.ok_or_else(|| {
            Error::Import("CSV import needs --waybill <number> to add drops to".to_string())
        })?;
        let rows = load_drops_from_csv(file)?;
        println!("Read {} drops from {}", rows.len(), file.display());

        let mut session = WaybillSession::from_waybill(repo.get(number)?, allocation_context(config));
        for row in rows {
            if let Some(rate) = row.rate {
                if session.waybill().rate <= 0.0 {
                    session.on_rate_change(rate)?;
                }
            }
            session.on_add_drop(NewDrop::new(row.consignee_name, row.cbm))?;
        }
        session
    } else {
        let document = load_waybill_document(file)?;
        if target.is_some_and(|t| t != document.waybill_number) {
            return Err(Error::Import(format!(
                "Document is for waybill {}, not {}",
                document.waybill_number,
                target.unwrap_or_default()
            )));
        }
        if repo.find_by_number(&document.waybill_number)?.is_some() {
            return Err(Error::Import(format!(
                "Waybill {} already exists",
                document.waybill_number
            )));
        }
        WaybillSession::from_document(document, allocation_context(config))?
    };

    let waybill = session.waybill();
    if dry_run {
        println!("Dry run: {} not saved", waybill.waybill_number);
    } else {
        repo.save(waybill)?;
        println!("Imported waybill {}", waybill.waybill_number);
    }
    output_waybill(
        output_format,
        waybill,
        &waybill.rate_breakdown(config.additional_rate),
    )
}

fn cmd_export(
    config: &Config,
    repo: &FileWaybillRepository,
    waybill_number: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let waybill = repo.get(waybill_number)?;
    let output_path = output.unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", waybill_number)));

    let breakdown = waybill.rate_breakdown(config.additional_rate);
    export_summary_to_excel(&waybill, &breakdown, &output_path)?;

    println!("Exported to: {}", output_path.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_approval(
    config: &Config,
    repo: &FileWaybillRepository,
    waybill_number: &str,
    drop: Option<&str>,
    action: ApprovalAction,
    reason: Option<String>,
    reference: Option<String>,
    no_wait: bool,
) -> Result<()> {
    let service = sync_service(config)?;
    let rt = runtime()?;

    let reference_id = match reference {
        Some(reference_id) => reference_id,
        None => {
            let waybill = repo.get(waybill_number)?;
            let selector = drop.ok_or_else(|| ValidationError::MissingField("drop".to_string()))?;
            let drop_id = resolve_drop(&waybill, selector)?;
            let request = rt.block_on(service.request_approval(&waybill, drop_id, action, reason))?;
            println!(
                "Approval requested: {} ({} {})",
                request.reference_id, request.action, selector
            );
            request.reference_id
        }
    };

    if no_wait {
        return Ok(());
    }

    println!("Waiting for approval of {} ...", reference_id);
    let last_seen: Arc<Mutex<Option<ApprovalRequest>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&last_seen);
    let cycles = rt.block_on(async {
        let task = watch_approval(
            service.api(),
            reference_id.clone(),
            config.poll_schedule(),
            move |request| {
                if let Ok(mut last) = sink.lock() {
                    if last.as_ref().map(|r| r.status) != Some(request.status) {
                        eprintln!("  status: {}", request.status);
                    }
                    *last = Some(request.clone());
                }
            },
        );
        task.join().await
    });
    let cycles = cycles.map_err(|e| Error::Api(ApiError::Network(e.to_string())))?;
    debug!(reference_id = %reference_id, cycles, "approval watch ended");

    let last = last_seen.lock().ok().and_then(|r| r.clone());
    match last {
        Some(request) if request.status == ApprovalStatus::Approved => {
            println!("Request {} approved", reference_id);
            if request.action == ApprovalAction::Delete {
                if let Some(drop_id) = request.consignee_id {
                    apply_approved_delete(config, repo, &service, &rt, waybill_number, drop_id)?;
                }
            }
        }
        Some(request) if request.status == ApprovalStatus::Rejected => {
            println!("Request {} rejected", reference_id)
        }
        _ => println!("Request {} expired without a decision", reference_id),
    }
    Ok(())
}

/// Remove an approved drop on the backend and in the local store
fn apply_approved_delete(
    config: &Config,
    repo: &FileWaybillRepository,
    service: &SyncService<HttpWaybillApi>,
    rt: &tokio::runtime::Runtime,
    waybill_number: &str,
    drop_id: Uuid,
) -> Result<()> {
    rt.block_on(service.delete_drop(waybill_number, drop_id))?;
    if let Some(waybill) = repo.find_by_number(waybill_number)? {
        if waybill.find_drop(drop_id).is_some() {
            let mut session = WaybillSession::from_waybill(waybill, allocation_context(config));
            session.on_delete_drop(drop_id)?;
            repo.save(session.waybill())?;
        }
    }
    println!("Deleted drop {} from {}", drop_id, waybill_number);
    Ok(())
}

fn cmd_subdetails(config: &Config, output_format: OutputFormat, waybill_number: &str) -> Result<()> {
    let service = sync_service(config)?;
    let details = runtime()?.block_on(service.subdetails(waybill_number))?;
    output_subdetails(output_format, waybill_number, &details)
}

fn cmd_config(
    show: bool,
    set_api_url: Option<String>,
    set_additional_rate: Option<f64>,
    set_amount_mode: Option<AmountMode>,
    set_output: Option<OutputFormat>,
    set_store_dir: Option<PathBuf>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    if let Some(url) = set_api_url {
        config.api_base_url = Some(url);
        modified = true;
    }

    if let Some(rate) = set_additional_rate {
        config.additional_rate = rate;
        modified = true;
    }

    if let Some(mode) = set_amount_mode {
        config.amount_mode = mode;
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    if let Some(dir) = set_store_dir {
        config.store_dir = Some(dir);
        modified = true;
    }

    if modified {
        config.validate()?;
        config.save()?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("{}", config);
    }

    Ok(())
}
