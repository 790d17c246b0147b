//! Heuristic classification of identifier naming style.
//!
//! Cryptic names tend to be short segments joined by underscores
//! (`t_cust_mst`, `t_ord_dtl`) as opposed to `customers`, `order_details`.

use scout_core::{NamingReport, NamingStatus};

/// Whether an identifier looks abbreviated: at least two underscore
/// segments averaging four characters or fewer.
pub fn is_cryptic(name: &str) -> bool {
    let parts: Vec<&str> = name.split('_').filter(|p| !p.is_empty()).collect();
    if parts.len() < 2 {
        return false;
    }
    let avg = parts.iter().map(|p| p.len()).sum::<usize>() as f64 / parts.len() as f64;
    avg <= 4.0
}

/// Classify a schema from its table names and column comment coverage.
pub fn classify(tables: &[String], commented_columns: usize, total_columns: usize) -> NamingReport {
    let cryptic_tables = tables.iter().filter(|t| is_cryptic(t)).count();

    let comment_pct = pct(commented_columns, total_columns);
    let cryptic_pct = pct(cryptic_tables, tables.len());

    let status = if comment_pct >= 50 {
        NamingStatus::Glossary
    } else if cryptic_pct >= 50 && comment_pct < 10 {
        NamingStatus::CrypticNoGlossary
    } else {
        NamingStatus::Descriptive
    };

    NamingReport {
        status,
        commented_columns,
        total_columns,
        cryptic_tables,
        total_tables: tables.len(),
    }
}

fn pct(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        part * 100 / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cryptic() {
        assert!(is_cryptic("t_cust_mst"));
        assert!(is_cryptic("t_ord_dtl"));
        assert!(!is_cryptic("customers"));
        assert!(!is_cryptic("order_details"));
    }

    #[test]
    fn test_classify_descriptive() {
        let tables = vec!["customers".to_string(), "orders".to_string()];
        let report = classify(&tables, 0, 12);
        assert_eq!(report.status, NamingStatus::Descriptive);
    }

    #[test]
    fn test_classify_cryptic_without_glossary() {
        let tables = vec!["t_cust_mst".to_string(), "t_ord_dtl".to_string()];
        let report = classify(&tables, 0, 12);
        assert_eq!(report.status, NamingStatus::CrypticNoGlossary);
    }

    #[test]
    fn test_classify_glossary_wins() {
        let tables = vec!["t_cust_mst".to_string(), "t_ord_dtl".to_string()];
        let report = classify(&tables, 8, 12);
        assert_eq!(report.status, NamingStatus::Glossary);
        assert_eq!(report.comment_pct(), 66);
    }
}
