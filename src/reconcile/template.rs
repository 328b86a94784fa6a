use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::table::{RecordSet, Value};

/// Business key column of the destination template.
pub const KEY_COLUMN: &str = "x_studio_rf_wb";

/// Practical cap on repeating blocks per template row.
pub const MAX_BLOCKS: usize = 20;

const CODE_COLUMN: &str = "x_studio_code_analytique";
const ADDRESS_COLUMN: &str = "x_studio_adresse";

/// Destination column receiving the summed main-rent amount.
pub const MAIN_RENT_COLUMN: &str = "x_studio_loyer_actuel_index";

/// Static account-code → destination-column table. Fixed external
/// configuration, not derived from data.
pub fn account_column(account: i64) -> Option<&'static str> {
    match account {
        700100 | 700200 | 600100 | 600200 => Some("x_studio_loyer_actuel_index"),
        700500 => Some("x_studio_intervention_obligatoire"),
        704000 => Some("x_studio_forfait"),
        701000 | 601900 => Some("x_studio_provision_pour_charge"),
        _ => None,
    }
}

/// Column name for block `index`: unsuffixed for block 0, `_1`, `_2`, …
/// for subsequent blocks.
fn suffixed(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, index)
    }
}

/// One repeating (analytical code, address) block plus the amounts written
/// into its suffixed columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub code: String,
    pub address: String,
    pub amounts: HashMap<&'static str, Decimal>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.address.is_empty()
    }
}

/// Outcome of the block search on a target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFit {
    /// A previously empty block now holds this pair.
    New(usize),
    /// An existing block already holds exactly this pair.
    Existing(usize),
}

impl BlockFit {
    pub fn index(&self) -> usize {
        match self {
            BlockFit::New(index) | BlockFit::Existing(index) => *index,
        }
    }
}

/// Per-key accumulator for one destination row, template-backed or spill.
/// Built once per run and written back at the end.
#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub key: String,
    pub blocks: Vec<Block>,
}

impl TemplateRow {
    pub fn new(key: String) -> TemplateRow {
        TemplateRow {
            key,
            blocks: Vec::new(),
        }
    }

    /// First-empty-or-matching block search, left to right, bounded by
    /// [`MAX_BLOCKS`]. `None` means capacity is exhausted.
    pub fn find_block(&mut self, code: &str, address: &str) -> Option<BlockFit> {
        for index in 0..MAX_BLOCKS {
            if index == self.blocks.len() {
                self.blocks.push(Block {
                    code: code.to_string(),
                    address: address.to_string(),
                    amounts: HashMap::new(),
                });
                return Some(BlockFit::New(index));
            }
            let block = &mut self.blocks[index];
            if block.code == code && block.address == address {
                return Some(BlockFit::Existing(index));
            }
            if block.is_empty() {
                block.code = code.to_string();
                block.address = address.to_string();
                return Some(BlockFit::New(index));
            }
        }
        None
    }
}

/// Reads the occupied blocks of a template row, one per (code, address)
/// column pair present in the header.
pub fn parse_blocks(set: &RecordSet, row: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    for index in 0..MAX_BLOCKS {
        let Some(code_column) = set.column_index(&suffixed(CODE_COLUMN, index)) else {
            break;
        };
        let address = set
            .column_index(&suffixed(ADDRESS_COLUMN, index))
            .map(|column| set.value(row, column).to_string())
            .unwrap_or_default();
        blocks.push(Block {
            code: set.value(row, code_column).to_string(),
            address,
            amounts: HashMap::new(),
        });
    }
    blocks
}

/// Writes blocks back into a row's suffixed columns. Columns absent from
/// the header are skipped, never fabricated. Returns the number of
/// non-empty cell writes that were dropped for lack of a column, so the
/// caller can surface how much data the template could not hold.
pub fn write_blocks(set: &mut RecordSet, row: usize, blocks: &[Block]) -> usize {
    let mut dropped = 0;
    for (index, block) in blocks.iter().enumerate() {
        match set.column_index(&suffixed(CODE_COLUMN, index)) {
            Some(column) => set.set_value(row, column, Value::text(block.code.clone())),
            None if !block.code.is_empty() => dropped += 1,
            None => {}
        }
        match set.column_index(&suffixed(ADDRESS_COLUMN, index)) {
            Some(column) => set.set_value(row, column, Value::text(block.address.clone())),
            None if !block.address.is_empty() => dropped += 1,
            None => {}
        }
        for (base, amount) in &block.amounts {
            match set.column_index(&suffixed(base, index)) {
                Some(column) => set.set_value(row, column, Value::Decimal(*amount)),
                None => dropped += 1,
            }
        }
    }
    dropped
}
