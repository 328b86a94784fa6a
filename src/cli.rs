use anyhow::{Context as _, Result};
use console::{style, StyledObject};
use std::path::Path;

use crate::args::{Args, Command};
use crate::ir::{self, JournalKind};
use crate::operations::dedup::blank_duplicate_keys;
use crate::operations::extract::{extract_address_codes, extract_reference_codes};
use crate::operations::remap::PartnerMapping;
use crate::operations::transform::prepare_journal;
use crate::reconcile;
use crate::{export, import};

pub fn main(args: Args) -> Result<()> {
    match args.command {
        Command::Transform {
            input,
            out_dir,
            partner_map,
        } => main_transform(&input, &out_dir, partner_map.as_deref()),
        Command::ExtractRefs { input, output } => main_extract(&input, &output, false),
        Command::ExtractAddresses { input, output } => main_extract(&input, &output, true),
        Command::Reconcile {
            input,
            template,
            out_dir,
        } => main_reconcile(&input, &template, &out_dir),
    }
}

fn main_transform(input: &Path, out_dir: &Path, partner_map: Option<&Path>) -> Result<()> {
    println!("{}", style_header("Transforming HMS export:"));
    let source = import::read_record_set(input)?;
    let records = ir::load_hms_records(&source)?;
    let mut mapping = load_partner_mapping(partner_map)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    for journal in ir::distinct_journals(&records) {
        log::info!("Processing journal: {}", journal);
        let mut sheet = prepare_journal(&records, &journal)?;
        if sheet.is_empty() {
            log::info!("No data for journal {}", journal);
            continue;
        }
        let schema = JournalKind::of(&journal).schema();
        blank_duplicate_keys(&mut sheet, schema.dedup_key_columns());
        if let Some(mapping) = &mut mapping {
            let remapped = mapping.apply(&mut sheet, schema.partner_column());
            log::info!("Journal {}: remapped {} partner ids", journal, remapped);
        }
        let path = out_dir.join(export::journal_file_name(&journal));
        export::write_record_set(&sheet, &path)?;
        println!("{} {} rows -> {}", style_journal(&journal), sheet.len(), path.display());
    }

    if let Some(mapping) = &mapping {
        let report = mapping.mismatch_report();
        let path = out_dir.join("partner_mismatches.csv");
        export::write_record_set(&report, &path)?;
        println!("Partner mismatch report: {} rows -> {}", report.len(), path.display());
    }
    Ok(())
}

/// A malformed mapping table is a configuration error: it is reported and
/// the remapping step is skipped, the rest of the pipeline continues.
fn load_partner_mapping(path: Option<&Path>) -> Result<Option<PartnerMapping>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let table = import::read_record_set(path)?;
    match PartnerMapping::from_record_set(&table) {
        Ok(mapping) => Ok(Some(mapping)),
        Err(err) => {
            log::error!("Partner mapping skipped: {:#}", err);
            println!("{}", style(format!("Partner mapping skipped: {:#}", err)).red());
            Ok(None)
        }
    }
}

fn main_extract(input: &Path, output: &Path, addresses: bool) -> Result<()> {
    println!(
        "{}",
        style_header(if addresses {
            "Extracting address codes:"
        } else {
            "Extracting reference codes:"
        })
    );
    let source = import::read_record_set(input)?;
    let report = if addresses {
        extract_address_codes(&source)?
    } else {
        extract_reference_codes(&source)?
    };
    export::write_record_set(&report, output)?;
    println!("{} rows -> {}", report.len(), output.display());
    Ok(())
}

fn main_reconcile(input: &Path, template: &Path, out_dir: &Path) -> Result<()> {
    println!("{}", style_header("Reconciling against destination template:"));
    let source = import::read_record_set(input)?;
    let records = ir::load_hms_records(&source)?;
    let template = import::read_record_set(template)?;

    let output = reconcile::reconcile(&records, template)?;
    log::info!(
        "Reconciliation summary: {}",
        serde_json::to_string(&output.summary)?
    );

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let template_path = out_dir.join("template_filled.csv");
    export::write_record_set(&output.template, &template_path)?;
    let spill_path = out_dir.join("spill.csv");
    export::write_record_set(&output.spill, &spill_path)?;

    println!(
        "{} groups, {} matched, {} spilled keys, {} blocks filled, {} reused, {} skipped, \
         {} cells dropped",
        output.summary.groups,
        output.summary.matched_groups,
        output.summary.spilled_keys,
        output.summary.blocks_allocated,
        output.summary.blocks_reused,
        output.summary.groups_skipped_no_block,
        output.summary.cells_dropped_missing_column,
    );
    println!("Template -> {}", template_path.display());
    println!("Spill    -> {}", spill_path.display());
    Ok(())
}

fn style_header(header: &str) -> StyledObject<&str> {
    style(header).bold().underlined()
}

fn style_journal(journal: &str) -> StyledObject<&str> {
    style(journal).cyan().bold()
}
