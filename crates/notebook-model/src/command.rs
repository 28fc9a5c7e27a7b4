//! Reversible cell-edit commands.
//!
//! Every structural edit to a notebook's cell sequence is expressed as a
//! [`Command`]. Applying a command computes its exact inverse *from the
//! pre-mutation state*, then mutates, then hands the inverse back — so
//! `apply(C)` followed by `apply(inverse(C))` reproduces the prior cell
//! sequence byte for byte, including cell uuids and ordering.
//!
//! The `Merge` and `Split` variants carry fields the public edit surface
//! never sets (`insert_newline`, `trim_newline`, and the `first`/`second`
//! identity overrides). They exist so that the inverse of a merge can
//! restore both original cells — uuids and types included — and so that
//! the inverse of a split can re-join without inventing a newline that was
//! never there. Use the constructors (`Command::merge`, `Command::split`,
//! ...) for user-initiated edits.

use uuid::Uuid;

use crate::cell::{Cell, CellType};

/// Identity override used when a split restores a previously merged cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellIdentity {
    pub uuid: Uuid,
    pub cell_type: CellType,
}

impl CellIdentity {
    fn of(cell: &Cell) -> Self {
        Self {
            uuid: cell.uuid,
            cell_type: cell.cell_type,
        }
    }
}

/// A reversible description of one structural edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert a new cell before `before` (end of the sequence when `None`).
    /// `id` is only set by inverse construction, to restore a deleted
    /// cell's original identity.
    Create {
        cell_type: CellType,
        source: String,
        before: Option<Uuid>,
        id: Option<Uuid>,
    },
    /// Remove the cell with the given uuid.
    Delete { target: Uuid },
    /// Overwrite `source` and/or `cell_type`, leaving identity and
    /// position untouched.
    Patch {
        target: Uuid,
        source: Option<String>,
        cell_type: Option<CellType>,
    },
    /// Relocate the cell to immediately before `before` (end when `None`).
    Move { target: Uuid, before: Option<Uuid> },
    /// Merge the target with its neighbor above or below. The merged cell
    /// keeps the target's uuid and cell type; sources concatenate in
    /// document order.
    Merge {
        target: Uuid,
        above: bool,
        insert_newline: bool,
    },
    /// Split the target's source at character offset `at` into two cells.
    Split {
        target: Uuid,
        at: usize,
        trim_newline: bool,
        first: Option<CellIdentity>,
        second: Option<CellIdentity>,
    },
}

/// Failures raised by command application or the history stacks.
///
/// A failed command performs no mutation at all: the cell sequence is left
/// untouched and nothing is pushed onto either history stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Cell not found with uuid: {0}")]
    CellNotFound(Uuid),

    #[error(
        "Cell {target} has no neighbor {} to merge with",
        if *above { "above" } else { "below" }
    )]
    NoValidNeighbor { target: Uuid, above: bool },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

impl CommandError {
    /// Stable machine-readable code for the REST layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            CommandError::CellNotFound(_) => "CELL_NOT_FOUND",
            CommandError::NoValidNeighbor { .. } => "NO_VALID_NEIGHBOR",
            CommandError::NothingToUndo => "NOTHING_TO_UNDO",
            CommandError::NothingToRedo => "NOTHING_TO_REDO",
        }
    }
}

impl Command {
    /// User-initiated cell creation.
    pub fn create(cell_type: CellType, source: impl Into<String>, before: Option<Uuid>) -> Self {
        Command::Create {
            cell_type,
            source: source.into(),
            before,
            id: None,
        }
    }

    /// User-initiated cell deletion.
    pub fn delete(target: Uuid) -> Self {
        Command::Delete { target }
    }

    /// User-initiated content update.
    pub fn patch(target: Uuid, source: Option<String>, cell_type: Option<CellType>) -> Self {
        Command::Patch {
            target,
            source,
            cell_type,
        }
    }

    /// User-initiated reorder.
    pub fn move_to(target: Uuid, before: Option<Uuid>) -> Self {
        Command::Move { target, before }
    }

    /// User-initiated merge; joins sources with a newline.
    pub fn merge(target: Uuid, above: bool) -> Self {
        Command::Merge {
            target,
            above,
            insert_newline: true,
        }
    }

    /// User-initiated split at a character offset (clamped to the source
    /// length).
    pub fn split(target: Uuid, at: usize) -> Self {
        Command::Split {
            target,
            at,
            trim_newline: false,
            first: None,
            second: None,
        }
    }

    /// Apply the forward edit to `cells`, returning the inverse command.
    ///
    /// The inverse is fully constructed before any mutation happens; on
    /// error the sequence is guaranteed unchanged.
    pub fn apply(&self, cells: &mut Vec<Cell>) -> Result<Command, CommandError> {
        match self {
            Command::Create {
                cell_type,
                source,
                before,
                id,
            } => {
                let insert_at = match before {
                    Some(b) => index_of(cells, *b)?,
                    None => cells.len(),
                };
                let cell = Cell::with_uuid(
                    id.unwrap_or_else(Uuid::new_v4),
                    *cell_type,
                    source.clone(),
                );
                let inverse = Command::delete(cell.uuid);
                cells.insert(insert_at, cell);
                Ok(inverse)
            }

            Command::Delete { target } => {
                let idx = index_of(cells, *target)?;
                // The cell that follows becomes the `before` anchor when
                // the deletion is undone.
                let before = cells.get(idx + 1).map(|c| c.uuid);
                let removed = cells.remove(idx);
                Ok(Command::Create {
                    cell_type: removed.cell_type,
                    source: removed.source,
                    before,
                    id: Some(removed.uuid),
                })
            }

            Command::Patch {
                target,
                source,
                cell_type,
            } => {
                let idx = index_of(cells, *target)?;
                let cell = &mut cells[idx];
                let inverse = Command::Patch {
                    target: *target,
                    source: Some(cell.source.clone()),
                    cell_type: Some(cell.cell_type),
                };
                if let Some(src) = source {
                    cell.source = src.clone();
                }
                if let Some(ty) = cell_type {
                    cell.cell_type = *ty;
                }
                Ok(inverse)
            }

            Command::Move { target, before } => {
                let idx = index_of(cells, *target)?;
                if let Some(b) = before {
                    if b != target {
                        index_of(cells, *b)?;
                    }
                }
                let undo_before = cells.get(idx + 1).map(|c| c.uuid);
                let inverse = Command::move_to(*target, undo_before);
                if *before == Some(*target) {
                    // Moving a cell before itself is the identity.
                    return Ok(inverse);
                }
                let cell = cells.remove(idx);
                let insert_at = match before {
                    Some(b) => index_of(cells, *b)?,
                    None => cells.len(),
                };
                cells.insert(insert_at, cell);
                Ok(inverse)
            }

            Command::Merge {
                target,
                above,
                insert_newline,
            } => {
                let idx = index_of(cells, *target)?;
                let neighbor_idx = if *above {
                    idx.checked_sub(1)
                        .ok_or(CommandError::NoValidNeighbor {
                            target: *target,
                            above: *above,
                        })?
                } else {
                    if idx + 1 >= cells.len() {
                        return Err(CommandError::NoValidNeighbor {
                            target: *target,
                            above: *above,
                        });
                    }
                    idx + 1
                };

                let (upper, lower) = if *above {
                    (&cells[neighbor_idx], &cells[idx])
                } else {
                    (&cells[idx], &cells[neighbor_idx])
                };

                // The inverse restores both original cells in place. When
                // merging upward the target ends up as the lower half, so
                // both restored identities must be pinned explicitly.
                let inverse = Command::Split {
                    target: *target,
                    at: upper.source_chars(),
                    trim_newline: *insert_newline,
                    first: above.then(|| CellIdentity::of(upper)),
                    second: Some(CellIdentity::of(lower)),
                };

                let sep = if *insert_newline { "\n" } else { "" };
                let merged_source = format!("{}{}{}", upper.source, sep, lower.source);

                // The target cell survives with its own uuid and type,
                // positioned where the upper cell was.
                cells[idx].source = merged_source;
                cells.remove(neighbor_idx);
                Ok(inverse)
            }

            Command::Split {
                target,
                at,
                trim_newline,
                first,
                second,
            } => {
                let idx = index_of(cells, *target)?;
                let cell = &cells[idx];

                let byte_at = char_offset_to_byte(&cell.source, *at);
                let first_source = cell.source[..byte_at].to_string();
                let mut second_source = cell.source[byte_at..].to_string();
                if *trim_newline && second_source.starts_with('\n') {
                    second_source.remove(0);
                }

                let second_id = second.map(|i| i.uuid).unwrap_or_else(Uuid::new_v4);
                let second_type = second.map(|i| i.cell_type).unwrap_or(cell.cell_type);

                // Re-joining the two halves reconstitutes the original
                // cell exactly; `first.is_some()` means the original merge
                // direction was upward.
                let inverse = Command::Merge {
                    target: *target,
                    above: first.is_some(),
                    insert_newline: *trim_newline,
                };

                match first {
                    Some(restored) => {
                        // The split cell keeps its identity as the lower
                        // half; the restored upper cell is inserted fresh.
                        let upper =
                            Cell::with_uuid(restored.uuid, restored.cell_type, first_source);
                        let cell = &mut cells[idx];
                        cell.source = second_source;
                        cell.uuid = second_id;
                        cell.cell_type = second_type;
                        cells.insert(idx, upper);
                    }
                    None => {
                        // The split cell keeps its identity (and outputs)
                        // as the first half; the second half is new.
                        cells[idx].source = first_source;
                        let lower = Cell::with_uuid(second_id, second_type, second_source);
                        cells.insert(idx + 1, lower);
                    }
                }
                Ok(inverse)
            }
        }
    }
}

fn index_of(cells: &[Cell], uuid: Uuid) -> Result<usize, CommandError> {
    cells
        .iter()
        .position(|c| c.uuid == uuid)
        .ok_or(CommandError::CellNotFound(uuid))
}

/// Translate a character offset into a byte offset, clamping past-the-end
/// offsets to the source length.
fn char_offset_to_byte(source: &str, at: usize) -> usize {
    source
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(source.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<Cell> {
        vec![
            Cell::new(CellType::Markdown, "## Simple Test Notebook"),
            Cell::new(CellType::Code, "print(\"Larry the Llama\")"),
            Cell::new(CellType::Code, "2+5"),
            Cell::new(CellType::Code, ""),
        ]
    }

    fn snapshot(cells: &[Cell]) -> Vec<(Uuid, CellType, String)> {
        cells
            .iter()
            .map(|c| (c.uuid, c.cell_type, c.source.clone()))
            .collect()
    }

    #[test]
    fn test_create_at_end_and_inverse() {
        let mut cells = fixture();
        let before = snapshot(&cells);

        let cmd = Command::create(CellType::Markdown, "hello", None);
        let inverse = cmd.apply(&mut cells).unwrap();
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[4].source, "hello");

        inverse.apply(&mut cells).unwrap();
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_create_before_cell() {
        let mut cells = fixture();
        let anchor = cells[2].uuid;

        let cmd = Command::create(CellType::Raw, "raw", Some(anchor));
        cmd.apply(&mut cells).unwrap();
        assert_eq!(cells[2].source, "raw");
        assert_eq!(cells[3].uuid, anchor);
    }

    #[test]
    fn test_create_before_missing_cell_is_untouched() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let bogus = Uuid::new_v4();

        let err = Command::create(CellType::Code, "x", Some(bogus))
            .apply(&mut cells)
            .unwrap_err();
        assert_eq!(err, CommandError::CellNotFound(bogus));
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_delete_round_trip_restores_identity_and_position() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let target = cells[1].uuid;

        let inverse = Command::delete(target).apply(&mut cells).unwrap();
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|c| c.uuid != target));

        inverse.apply(&mut cells).unwrap();
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_delete_last_cell_round_trip() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let target = cells[3].uuid;

        let inverse = Command::delete(target).apply(&mut cells).unwrap();
        inverse.apply(&mut cells).unwrap();
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_patch_round_trip() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let target = cells[2].uuid;

        let cmd = Command::patch(target, Some("3+4".into()), Some(CellType::Markdown));
        let inverse = cmd.apply(&mut cells).unwrap();
        assert_eq!(cells[2].source, "3+4");
        assert_eq!(cells[2].cell_type, CellType::Markdown);
        assert_eq!(cells[2].uuid, target);

        inverse.apply(&mut cells).unwrap();
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_patch_single_field_leaves_other_untouched() {
        let mut cells = fixture();
        let target = cells[2].uuid;

        Command::patch(target, Some("9*9".into()), None)
            .apply(&mut cells)
            .unwrap();
        assert_eq!(cells[2].source, "9*9");
        assert_eq!(cells[2].cell_type, CellType::Code);
    }

    #[test]
    fn test_move_swaps_and_inverse_restores() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let ids: Vec<Uuid> = cells.iter().map(|c| c.uuid).collect();

        // Move cell 2 before cell 1: swap positions 1 and 2.
        let inverse = Command::move_to(ids[2], Some(ids[1]))
            .apply(&mut cells)
            .unwrap();
        let moved: Vec<Uuid> = cells.iter().map(|c| c.uuid).collect();
        assert_eq!(moved, vec![ids[0], ids[2], ids[1], ids[3]]);

        inverse.apply(&mut cells).unwrap();
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_move_without_anchor_goes_to_end() {
        let mut cells = fixture();
        let ids: Vec<Uuid> = cells.iter().map(|c| c.uuid).collect();

        Command::move_to(ids[0], None).apply(&mut cells).unwrap();
        let moved: Vec<Uuid> = cells.iter().map(|c| c.uuid).collect();
        assert_eq!(moved, vec![ids[1], ids[2], ids[3], ids[0]]);
    }

    #[test]
    fn test_move_before_itself_is_identity() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let target = cells[1].uuid;

        let inverse = Command::move_to(target, Some(target))
            .apply(&mut cells)
            .unwrap();
        assert_eq!(snapshot(&cells), before);
        inverse.apply(&mut cells).unwrap();
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_merge_above_keeps_target_identity_and_type() {
        // Mirrors the documented behavior: the merged cell keeps the
        // *target's* uuid and cell type regardless of merge direction.
        let mut cells = fixture();
        let target = cells[1].uuid;

        Command::merge(target, true).apply(&mut cells).unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(
            cells[0].source,
            "## Simple Test Notebook\nprint(\"Larry the Llama\")"
        );
        assert_eq!(cells[0].cell_type, CellType::Code);
        assert_eq!(cells[0].uuid, target);
    }

    #[test]
    fn test_merge_below_keeps_target_identity_and_type() {
        let mut cells = fixture();
        let target = cells[0].uuid;

        Command::merge(target, false).apply(&mut cells).unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(
            cells[0].source,
            "## Simple Test Notebook\nprint(\"Larry the Llama\")"
        );
        assert_eq!(cells[0].cell_type, CellType::Markdown);
        assert_eq!(cells[0].uuid, target);
    }

    #[test]
    fn test_merge_round_trip_restores_both_cells_exactly() {
        for above in [true, false] {
            let mut cells = fixture();
            let before = snapshot(&cells);
            let target = cells[if above { 1 } else { 0 }].uuid;

            let inverse = Command::merge(target, above).apply(&mut cells).unwrap();
            assert_eq!(cells.len(), 3);
            inverse.apply(&mut cells).unwrap();
            assert_eq!(snapshot(&cells), before, "above={}", above);
        }
    }

    #[test]
    fn test_merge_without_neighbor_fails_clean() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let first = cells[0].uuid;
        let last = cells[3].uuid;

        let err = Command::merge(first, true).apply(&mut cells).unwrap_err();
        assert_eq!(
            err,
            CommandError::NoValidNeighbor {
                target: first,
                above: true
            }
        );
        let err = Command::merge(last, false).apply(&mut cells).unwrap_err();
        assert_eq!(err.error_code(), "NO_VALID_NEIGHBOR");
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_split_keeps_uuid_on_first_half() {
        let mut cells = fixture();
        let target = cells[2].uuid;

        Command::split(target, 2).apply(&mut cells).unwrap();
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[2].source, "2+");
        assert_eq!(cells[2].uuid, target);
        assert_eq!(cells[3].source, "5");
        assert_eq!(cells[3].cell_type, CellType::Code);
        assert_ne!(cells[3].uuid, target);
    }

    #[test]
    fn test_split_round_trip_rejoins_without_extra_newline() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let target = cells[1].uuid;

        let inverse = Command::split(target, 5).apply(&mut cells).unwrap();
        assert_eq!(cells.len(), 5);
        inverse.apply(&mut cells).unwrap();
        assert_eq!(snapshot(&cells), before);
    }

    #[test]
    fn test_split_at_zero_and_end_produce_empty_halves() {
        let mut cells = fixture();
        let target = cells[2].uuid;

        Command::split(target, 0).apply(&mut cells).unwrap();
        assert_eq!(cells[2].source, "");
        assert_eq!(cells[3].source, "2+5");

        let mut cells = fixture();
        let target = cells[2].uuid;
        Command::split(target, 3).apply(&mut cells).unwrap();
        assert_eq!(cells[2].source, "2+5");
        assert_eq!(cells[3].source, "");
    }

    #[test]
    fn test_split_offset_is_in_characters() {
        let mut cells = vec![Cell::new(CellType::Markdown, "héllo wörld")];
        let target = cells[0].uuid;

        Command::split(target, 6).apply(&mut cells).unwrap();
        assert_eq!(cells[0].source, "héllo ");
        assert_eq!(cells[1].source, "wörld");
    }

    #[test]
    fn test_split_past_end_clamps() {
        let mut cells = fixture();
        let target = cells[2].uuid;

        Command::split(target, 10_000).apply(&mut cells).unwrap();
        assert_eq!(cells[2].source, "2+5");
        assert_eq!(cells[3].source, "");
    }

    #[test]
    fn test_unknown_target_fails_every_command_kind() {
        let mut cells = fixture();
        let before = snapshot(&cells);
        let bogus = Uuid::new_v4();

        let commands = [
            Command::delete(bogus),
            Command::patch(bogus, Some("x".into()), None),
            Command::move_to(bogus, None),
            Command::merge(bogus, true),
            Command::split(bogus, 0),
        ];
        for cmd in commands {
            let err = cmd.apply(&mut cells).unwrap_err();
            assert_eq!(err, CommandError::CellNotFound(bogus));
            assert_eq!(err.error_code(), "CELL_NOT_FOUND");
            assert_eq!(snapshot(&cells), before);
        }
    }

    #[test]
    fn test_untouched_cells_keep_their_uuids() {
        let mut cells = fixture();
        let ids: Vec<Uuid> = cells.iter().map(|c| c.uuid).collect();

        Command::split(ids[2], 1).apply(&mut cells).unwrap();
        Command::merge(ids[1], true).apply(&mut cells).unwrap();
        Command::patch(ids[3], Some("pass".into()), None)
            .apply(&mut cells)
            .unwrap();

        for id in [ids[0], ids[1], ids[2], ids[3]] {
            assert!(cells.iter().any(|c| c.uuid == id), "lost {}", id);
        }
    }
}
