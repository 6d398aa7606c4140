//! CPLEX LP export.

use crate::model::{Integrality, Model, ObjectiveSense, Sense};
use esm_core::{Coord, EsmResult, LinExpr};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Terms per line; LP readers cap line length.
const TERMS_PER_LINE: usize = 8;

/// Replace anything outside the LP name character set.
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "!\"#$%&()/,.;?@_`'{}|~".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        out.insert(0, '_');
    }
    out
}

fn indexed_name(name: &str, coords: &[Coord]) -> String {
    if coords.is_empty() {
        return sanitize(name);
    }
    let parts: Vec<String> = coords.iter().map(|c| c.to_string()).collect();
    sanitize(&format!("{}({})", name, parts.join(",")))
}

fn write_terms<W: Write>(out: &mut W, expr: &LinExpr, names: &[String]) -> EsmResult<()> {
    if expr.terms().is_empty() {
        match names.first() {
            Some(first) => write!(out, " 0 {}", first)?,
            None => write!(out, " 0")?,
        }
        return Ok(());
    }
    for (i, &(id, coef)) in expr.terms().iter().enumerate() {
        if i > 0 && i % TERMS_PER_LINE == 0 {
            write!(out, "\n   ")?;
        }
        let sign = if coef < 0.0 { '-' } else { '+' };
        write!(out, " {} {} {}", sign, coef.abs(), names[id.index()])?;
    }
    Ok(())
}

impl Model {
    /// Write the model in CPLEX LP format.
    pub fn write_lp(&self, path: impl AsRef<Path>) -> EsmResult<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        let variables = self.variables();
        let columns = variables.columns();
        let names: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let (name, coords) = variables.column_coords(esm_core::VarId(i as u32));
                indexed_name(name, &coords)
            })
            .collect();

        writeln!(out, "\\ scenario: {}", self.scenario())?;
        match self.objective().sense {
            ObjectiveSense::Minimise => writeln!(out, "Minimize")?,
            ObjectiveSense::Maximise => writeln!(out, "Maximize")?,
        }
        write!(out, " obj:")?;
        write_terms(&mut out, &self.objective().expr, &names)?;
        let constant = self.objective().expr.constant_term();
        if constant != 0.0 {
            write!(out, " {} {}", if constant < 0.0 { '-' } else { '+' }, constant.abs())?;
        }
        writeln!(out)?;

        writeln!(out, "Subject To")?;
        for constraint in self.constraints().iter() {
            for row in constraint.rows() {
                let label = indexed_name(constraint.name(), &constraint.coords_of(row));
                write!(out, " {}:", label)?;
                write_terms(&mut out, &row.expr, &names)?;
                let op = match row.sense {
                    Sense::Le => "<=",
                    Sense::Ge => ">=",
                    Sense::Eq => "=",
                };
                writeln!(out, " {} {}", op, row.rhs)?;
            }
        }

        writeln!(out, "Bounds")?;
        for (column, name) in columns.iter().zip(&names) {
            if column.integrality == Integrality::Binary {
                continue;
            }
            match (column.lower.is_finite(), column.upper.is_finite()) {
                (true, true) if column.lower == column.upper => {
                    writeln!(out, " {} = {}", name, column.lower)?
                }
                (true, true) => writeln!(out, " {} <= {} <= {}", column.lower, name, column.upper)?,
                (true, false) => writeln!(out, " {} >= {}", name, column.lower)?,
                (false, true) => writeln!(out, " -inf <= {} <= {}", name, column.upper)?,
                (false, false) => writeln!(out, " {} free", name)?,
            }
        }

        for (section, kind) in [("General", Integrality::Integer), ("Binary", Integrality::Binary)] {
            let selected: Vec<&String> = columns
                .iter()
                .zip(&names)
                .filter(|(c, _)| c.integrality == kind)
                .map(|(_, n)| n)
                .collect();
            if selected.is_empty() {
                continue;
            }
            writeln!(out, "{}", section)?;
            for chunk in selected.chunks(TERMS_PER_LINE) {
                let line: Vec<&str> = chunk.iter().map(|s| s.as_str()).collect();
                writeln!(out, " {}", line.join(" "))?;
            }
        }
        writeln!(out, "End")?;
        out.flush()?;

        tracing::info!(
            path = %path.display(),
            columns = columns.len(),
            rows = self.constraints().row_count(),
            "LP written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize("Rate[R1, DAY]"), "Rate_R1,_DAY_");
        assert_eq!(sanitize("NewCapacity(R1,GAS,2020)"), "NewCapacity(R1,GAS,2020)");
        assert_eq!(sanitize("2020x"), "_2020x");
        assert_eq!(sanitize("a-b+c"), "a_b_c");
    }

    #[test]
    fn test_indexed_names_join_coordinates() {
        let coords = vec![Coord::from("R1"), Coord::from("GAS"), Coord::from(2020i64)];
        assert_eq!(indexed_name("NewCapacity", &coords), "NewCapacity(R1,GAS,2020)");
        assert_eq!(indexed_name("Scalar", &[]), "Scalar");
    }
}
