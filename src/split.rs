use crate::paste::PASTE_HEADER;

pub const DEFAULT_MAX_CHARS: usize = 100_000;

const ROW_BOUNDARY: &str = "\n- ";

/// Cuts formatted paste text into row blocks, each ending with its own newlines.
/// Concatenating the blocks gives back `text`.
pub fn row_blocks(text: &str) -> Vec<String> {
    let pieces: Vec<&str> = text.split(ROW_BOUNDARY).collect();
    let last = pieces.len() - 1;
    pieces
        .iter()
        .enumerate()
        .map(|(i, piece)| {
            let mut block = String::with_capacity(piece.len() + 3);
            if i > 0 {
                block.push_str("- ");
            }
            block.push_str(piece);
            if i < last {
                block.push('\n');
            }
            block
        })
        .filter(|b| !b.is_empty())
        .collect()
}

/// Groups row blocks into units of at most `max_chars` characters (header excluded).
/// A block that alone exceeds the budget gets a unit of its own.
pub fn split_paste(text: &str, max_chars: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut units = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for block in row_blocks(text) {
        let len = block.chars().count();
        if current_len > 0 && current_len + len > max_chars {
            units.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(&block);
        current_len += len;
    }
    if !current.is_empty() {
        units.push(current);
    }

    log::debug!("split {} chars into {} unit(s)", text.chars().count(), units.len());
    units.into_iter().map(|u| format!("{}{}", PASTE_HEADER, u)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paste::format_table;
    use crate::table::parse_csv;

    fn sample(rows: usize) -> String {
        let mut csv = String::from("Name,Notes,Tags\n");
        for i in 0..rows {
            csv.push_str(&format!("row {},\"note - {} - x\",\"a,b\"\n", i, i));
        }
        format_table(&parse_csv(&csv).unwrap(), Some(","))
    }

    fn bodies(units: &[String]) -> Vec<&str> {
        units.iter().map(|u| u.strip_prefix(PASTE_HEADER).unwrap()).collect()
    }

    #[test]
    fn small_text_is_one_unit_with_header() {
        let text = sample(3);
        let units = split_paste(&text, DEFAULT_MAX_CHARS);
        assert_eq!(units.len(), 1);
        assert!(units[0].starts_with("%%tana%%\n\n- row 0 #Name"));
        assert_eq!(bodies(&units)[0], text);
    }

    #[test]
    fn concatenated_units_reproduce_input() {
        let text = sample(40);
        for budget in [1, 50, 120, 333, 1000] {
            let units = split_paste(&text, budget);
            assert_eq!(bodies(&units).concat(), text, "budget {}", budget);
        }
    }

    #[test]
    fn units_hold_whole_row_blocks_within_budget() {
        let text = sample(25);
        let blocks = row_blocks(&text);
        assert_eq!(blocks.len(), 25);
        let block_len = blocks[0].chars().count();
        let budget = block_len * 3 + 1;
        let units = split_paste(&text, budget);
        for body in bodies(&units) {
            assert!(body.chars().count() <= budget);
            assert!(body.starts_with("- row "));
            assert!(body.ends_with("\n\n"));
        }
        assert!(units.len() >= 9);
    }

    #[test]
    fn oversized_block_gets_its_own_unit() {
        let text = sample(3);
        let units = split_paste(&text, 5);
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(split_paste("", 100).is_empty());
        assert!(split_paste("\n\n", 100).is_empty());
    }

    #[test]
    fn field_dashes_are_not_row_boundaries() {
        let blocks = row_blocks("- a #T\n  - f:: x\n    - y\n\n- b #T\n\n");
        assert_eq!(blocks, vec!["- a #T\n  - f:: x\n    - y\n\n".to_string(), "- b #T\n\n".to_string()]);
    }
}
