use std::{cmp::Ordering, sync::Arc};

use crate::{
    domain::{Column, Literal, Record, Value},
    query::QueryError,
    table::View,
};

/// Separator between clauses of a filter query.
pub const CLAUSE_DELIMITER: &str = " && ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Ge,
    Le,
    Lt,
    Gt,
    Ne,
    Eq,
    Contains,
    DateStartsWith,
}

impl Operator {
    /// Order in which operators are looked for in a clause; first match wins.
    pub const PRECEDENCE: [Operator; 8] = [
        Operator::Ge,
        Operator::Le,
        Operator::Lt,
        Operator::Gt,
        Operator::Ne,
        Operator::Eq,
        Operator::Contains,
        Operator::DateStartsWith,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Operator::Ge => "ge",
            Operator::Le => "le",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::Ne => "ne",
            Operator::Eq => "eq",
            Operator::Contains => "contains",
            Operator::DateStartsWith => "datestartswith",
        }
    }

    fn symbol(&self) -> Option<&'static str> {
        match self {
            Operator::Ge => Some(">="),
            Operator::Le => Some("<="),
            Operator::Lt => Some("<"),
            Operator::Gt => Some(">"),
            Operator::Ne => Some("!="),
            Operator::Eq => Some("="),
            Operator::Contains | Operator::DateStartsWith => None,
        }
    }

    /// Apply the operator to one cell.
    ///
    /// Numeric literals compare numerically (text cells are parsed first);
    /// text literals compare against the cell's string form. A comparison
    /// that cannot be made is false for everything but `ne`.
    pub fn evaluate(&self, cell: &Value, literal: &Literal) -> bool {
        let ordering = || match literal {
            Literal::Number(n) => cell.as_f64().and_then(|c| c.partial_cmp(n)),
            Literal::Text(s) => Some(cell.to_text().as_ref().cmp(s.as_str())),
        };

        match self {
            Operator::Contains => cell.to_text().contains(literal.to_text().as_ref()),
            Operator::DateStartsWith => cell.to_text().starts_with(literal.to_text().as_ref()),
            Operator::Eq => ordering() == Some(Ordering::Equal),
            Operator::Ne => ordering() != Some(Ordering::Equal),
            Operator::Lt => ordering() == Some(Ordering::Less),
            Operator::Gt => ordering() == Some(Ordering::Greater),
            Operator::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            Operator::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

/// One parsed `{column} operator value` unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub column: String,
    pub operator: Operator,
    pub value: Literal,
}

/// Marks bytes that operator matching must skip: the `{...}` column
/// reference and quoted literals (escapes included).
fn inert_mask(text: &str) -> Vec<bool> {
    let bytes = text.as_bytes();
    let mut mask = vec![false; bytes.len()];

    let reference = text
        .find('{')
        .and_then(|open| text[open..].find('}').map(|close| (open, open + close)));

    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        if matches!(reference, Some((open, close)) if (open..=close).contains(&i)) {
            mask[i] = true;
            i += 1;
            continue;
        }
        let b = bytes[i];
        match quote {
            Some(q) => {
                mask[i] = true;
                if b == b'\\' && i + 1 < bytes.len() {
                    mask[i + 1] = true;
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
            }
            None if matches!(b, b'\'' | b'"' | b'`') => {
                quote = Some(b);
                mask[i] = true;
            }
            None => {}
        }
        i += 1;
    }
    mask
}

fn find_unmasked(text: &str, mask: &[bool], needle: &str, bounded: bool) -> Option<usize> {
    text.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let end = i + needle.len();
        if mask[i..end].iter().any(|m| *m) {
            return false;
        }
        !bounded
            || (text[..i].chars().next_back().is_some_and(char::is_whitespace)
                && text[end..].chars().next().is_some_and(char::is_whitespace))
    })
}

fn parse_literal(raw: &str) -> Literal {
    let v = raw.trim();
    let mut chars = v.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        if first == last && matches!(first, '\'' | '"' | '`') {
            let inner = &v[first.len_utf8()..v.len() - last.len_utf8()];
            return Literal::Text(inner.replace(&format!("\\{first}"), &first.to_string()));
        }
    }
    match v.parse::<f64>() {
        Ok(n) => Literal::Number(n),
        Err(_) => Literal::Text(v.to_string()),
    }
}

/// Parse a single clause. `None` means no operator was recognized and the
/// clause matches everything.
pub fn parse_clause(part: &str) -> Option<Clause> {
    let mask = inert_mask(part);

    let (operator, at, len) = Operator::PRECEDENCE.iter().find_map(|op| {
        let keyword = op.keyword();
        find_unmasked(part, &mask, keyword, true)
            .map(|at| (*op, at, keyword.len()))
            .or_else(|| {
                let symbol = op.symbol()?;
                find_unmasked(part, &mask, symbol, false).map(|at| (*op, at, symbol.len()))
            })
    })?;

    let name_part = &part[..at];
    let column = match (name_part.find('{'), name_part.rfind('}')) {
        (Some(open), Some(close)) if close > open => &name_part[open + 1..close],
        _ => name_part.trim(),
    };

    Some(Clause {
        column: column.to_string(),
        operator,
        value: parse_literal(&part[at + len..]),
    })
}

/// A parsed filter query: the clauses that carried a recognized operator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    clauses: Vec<Clause>,
}

impl FilterQuery {
    pub fn parse(query: &str) -> Self {
        let clauses = query
            .split(CLAUSE_DELIMITER)
            .filter_map(|part| {
                let clause = parse_clause(part);
                if clause.is_none() && !part.trim().is_empty() {
                    tracing::debug!(clause = part, "filter clause has no operator, ignoring");
                }
                clause
            })
            .collect();
        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Bind every clause to a column of `view`.
    pub fn compile(&self, view: &View) -> Result<CompiledFilter, QueryError> {
        let predicates = self
            .clauses
            .iter()
            .map(|c| {
                Ok(Predicate {
                    column: view.resolve(&c.column)?,
                    operator: c.operator,
                    value: c.value.clone(),
                })
            })
            .collect::<Result<Vec<_>, QueryError>>()?;
        Ok(CompiledFilter { predicates })
    }
}

#[derive(Debug, Clone)]
struct Predicate {
    column: Column,
    operator: Operator,
    value: Literal,
}

impl Predicate {
    fn matches(&self, record: &Record) -> bool {
        self.operator.evaluate(&record.value(self.column), &self.value)
    }
}

/// Clauses bound to concrete columns; a row must satisfy all of them.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    predicates: Vec<Predicate>,
}

impl CompiledFilter {
    /// Narrow `rows` one clause at a time.
    pub fn apply(&self, mut rows: Vec<Arc<Record>>) -> Vec<Arc<Record>> {
        for p in &self.predicates {
            rows.retain(|r| p.matches(r));
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Metric,
        table::{unified::tests::record, View, ViewKind},
    };

    fn clause(column: &str, operator: Operator, value: Literal) -> Option<Clause> {
        Some(Clause {
            column: column.to_string(),
            operator,
            value,
        })
    }

    fn table(records: Vec<Record>) -> View {
        View::new(ViewKind::Table, records.into_iter().map(Arc::new).collect())
    }

    #[test]
    fn parses_keyword_operators() {
        assert_eq!(
            parse_clause("{Borough} eq \"MANHATTAN\""),
            clause("Borough", Operator::Eq, Literal::Text("MANHATTAN".into()))
        );
        assert_eq!(
            parse_clause("{ENERGY STAR Score} ge 80"),
            clause("ENERGY STAR Score", Operator::Ge, Literal::Number(80.0))
        );
        assert_eq!(
            parse_clause("{NTA} contains East"),
            clause("NTA", Operator::Contains, Literal::Text("East".into()))
        );
        assert_eq!(
            parse_clause("{Address 1} datestartswith '12'"),
            clause("Address 1", Operator::DateStartsWith, Literal::Text("12".into()))
        );
    }

    #[test]
    fn parses_symbolic_aliases() {
        assert_eq!(
            parse_clause("{Year Built} <= 1950"),
            clause("Year Built", Operator::Le, Literal::Number(1950.0))
        );
        assert_eq!(
            parse_clause("{Year Built} != 1950"),
            clause("Year Built", Operator::Ne, Literal::Number(1950.0))
        );
        assert_eq!(
            parse_clause("{Year Built} < 1950"),
            clause("Year Built", Operator::Lt, Literal::Number(1950.0))
        );
    }

    #[test]
    fn quoted_values_are_unescaped() {
        assert_eq!(
            parse_clause(r#"{Property Name} eq "The \"Ansonia\"""#),
            clause("Property Name", Operator::Eq, Literal::Text("The \"Ansonia\"".into()))
        );
        assert_eq!(
            parse_clause("{Property Name} eq `12`"),
            clause("Property Name", Operator::Eq, Literal::Text("12".into()))
        );
    }

    #[test]
    fn operator_words_inside_literals_are_not_matched() {
        assert_eq!(
            parse_clause("{Property Name} contains \"the ge lt building\""),
            clause("Property Name", Operator::Contains, Literal::Text("the ge lt building".into()))
        );
        assert_eq!(
            parse_clause("{Property Name} eq 'a >= b'"),
            clause("Property Name", Operator::Eq, Literal::Text("a >= b".into()))
        );
    }

    #[test]
    fn operator_words_inside_column_names_are_not_matched() {
        assert_eq!(
            parse_clause("{Green Power - Onsite and Offsite (kBtu)} gt 0"),
            clause("Green Power - Onsite and Offsite (kBtu)", Operator::Gt, Literal::Number(0.0))
        );
    }

    #[test]
    fn keywords_need_surrounding_whitespace() {
        assert_eq!(parse_clause("{Borough}eq MANHATTAN"), None);
        assert_eq!(parse_clause("{Borough} equals MANHATTAN"), None);
        assert_eq!(parse_clause(""), None);
    }

    #[test]
    fn unquoted_non_numbers_stay_text() {
        assert_eq!(
            parse_clause("{Community Board} eq 103a"),
            clause("Community Board", Operator::Eq, Literal::Text("103a".into()))
        );
    }

    #[test]
    fn clause_without_operator_is_a_no_op() {
        let query = FilterQuery::parse("{Borough} eq MANHATTAN && garbage");
        assert_eq!(query.clauses().len(), 1);
        assert!(FilterQuery::parse("").clauses().is_empty());
    }

    #[test]
    fn eq_on_text_column() {
        let view = table(vec![record(1, "MANHATTAN", 2016, &[]), record(2, "BRONX", 2016, &[])]);
        let filter = FilterQuery::parse(r#"{Borough} eq "MANHATTAN""#).compile(&view).unwrap();
        let kept = filter.apply(view.rows().to_vec());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].building.property_id, 1);
    }

    #[test]
    fn ge_includes_boundary() {
        let view = table(vec![
            record(1, "MANHATTAN", 2016, &[(Metric::EnergyStarScore, 80.0)]),
            record(2, "MANHATTAN", 2016, &[(Metric::EnergyStarScore, 79.0)]),
        ]);
        let filter = FilterQuery::parse("{ENERGY STAR Score} ge 80").compile(&view).unwrap();
        let kept = filter.apply(view.rows().to_vec());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].building.property_id, 1);
    }

    #[test]
    fn clauses_are_anded() {
        let view = table(vec![
            record(1, "MANHATTAN", 2016, &[(Metric::EnergyStarScore, 90.0)]),
            record(2, "MANHATTAN", 2016, &[(Metric::EnergyStarScore, 10.0)]),
            record(3, "BRONX", 2016, &[(Metric::EnergyStarScore, 95.0)]),
        ]);
        let filter = FilterQuery::parse("{Borough} eq MANHATTAN && {ENERGY STAR Score} gt 50")
            .compile(&view)
            .unwrap();
        let ids: Vec<i64> = filter
            .apply(view.rows().to_vec())
            .iter()
            .map(|r| r.building.property_id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let view = table(
            (0..10)
                .map(|i| record(i, "QUEENS", 2016, &[(Metric::SiteEui, i as f64)]))
                .collect(),
        );
        let filter = FilterQuery::parse("{Site EUI (kBtu/ft²)} lt 5").compile(&view).unwrap();
        let once = filter.apply(view.rows().to_vec());
        let twice = filter.apply(once.clone());
        let ids = |rows: &[Arc<Record>]| {
            rows.iter().map(|r| r.building.property_id).collect::<Vec<_>>()
        };
        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(ids(&once), vec![0, 1, 2, 3, 4]);
        let again = FilterQuery::parse("{Site EUI (kBtu/ft²)} lt 5").compile(&view).unwrap();
        assert_eq!(ids(&again.apply(view.rows().to_vec())), ids(&once));
    }

    #[test]
    fn missing_values_only_match_ne() {
        let missing = Value::Number(f64::NAN);
        let five = Literal::Number(5.0);
        assert!(!Operator::Eq.evaluate(&missing, &five));
        assert!(!Operator::Ge.evaluate(&missing, &five));
        assert!(!Operator::Lt.evaluate(&missing, &five));
        assert!(Operator::Ne.evaluate(&missing, &five));
    }

    #[test]
    fn numeric_literal_against_text_column_parses_the_cell() {
        let cb = Value::Text("103".into());
        assert!(Operator::Eq.evaluate(&cb, &Literal::Number(103.0)));
        assert!(Operator::Gt.evaluate(&cb, &Literal::Number(100.0)));
        assert!(!Operator::Eq.evaluate(&Value::Text("MN".into()), &Literal::Number(1.0)));
    }

    #[test]
    fn contains_is_case_sensitive_substring_of_string_form() {
        let name = Value::Text("Loisaida Center".into());
        assert!(Operator::Contains.evaluate(&name, &Literal::Text("Center".into())));
        assert!(!Operator::Contains.evaluate(&name, &Literal::Text("center".into())));
        assert!(Operator::Contains.evaluate(&Value::Number(2018.0), &Literal::Number(201.0)));
        assert!(Operator::DateStartsWith
            .evaluate(&Value::Number(2018.0), &Literal::Text("20".into())));
    }

    #[test]
    fn unknown_column_fails_compilation() {
        let view = View::new(ViewKind::Totals, Vec::new());
        let err = FilterQuery::parse("{Source EUI (kBtu/ft²)} gt 1").compile(&view).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownColumn {
                column: "Source EUI (kBtu/ft²)".into(),
                view: ViewKind::Totals,
            }
        );
    }
}
