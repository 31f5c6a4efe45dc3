use crate::error::UserError;
use crate::grammar::{statics, GrammarRegistry};

/// Space added after the widest entry of each column.
const COLUMN_GAP: usize = 5;

/// One aligned row per rule (display name, example, description), then the
/// static operand symbols.
pub fn supported_operands(registry: &GrammarRegistry) -> Result<String, UserError> {
    let mut rows = Vec::with_capacity(registry.len());
    for (_, rule) in registry.iter() {
        let doc = rule.doc();
        if rule.is_custom() && !doc.is_complete() {
            return Err(UserError::InvalidDoc { rule: rule.name().to_string() });
        }
        rows.push([doc.verbose_name.as_str(), doc.example.as_str(), doc.description.as_str()]);
    }

    let width = |col: usize| rows.iter().map(|r| r[col].chars().count()).max().unwrap_or(0) + COLUMN_GAP;
    let (name_w, example_w, description_w) = (width(0), width(1), width(2));

    let lines: Vec<String> = rows
        .iter()
        .map(|[name, example, description]| {
            format!("{:<name_w$}{:<example_w$}{:<description_w$}", name, example, description)
        })
        .collect();
    let symbols: Vec<&str> = statics::symbols().collect();
    Ok(format!("{}\nAlso:\t{}", lines.join("\n"), symbols.join(", ")))
}
