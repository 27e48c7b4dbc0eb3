use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use gwaudit_core::fmt_num;
use gwaudit_google::model::Token;

use super::PipelineSummary;
use crate::records::{TokenRow, UserRecord};
use crate::report::write_report;

/// Expand a `users.csv` report into one row per (user, token) pair.
///
/// Runs offline. Users without tokens, or whose token fetch failed, produce
/// no rows; malformed token columns are logged and counted as failed.
pub fn analyze_users(input: &Path, output: &Path) -> Result<PipelineSummary> {
    let start = Instant::now();
    let mut reader = csv::Reader::from_path(input)
        .with_context(|| format!("Cannot open {}", input.display()))?;

    let mut rows = Vec::new();
    let mut users = 0usize;
    let mut failed_items = 0usize;
    for (line, record) in reader.deserialize::<UserRecord>().enumerate() {
        let user = record.with_context(|| format!("{}: bad row {}", input.display(), line + 2))?;
        users += 1;
        if user.tokens.is_empty() {
            continue;
        }
        match serde_json::from_str::<Vec<Token>>(&user.tokens) {
            Ok(tokens) => rows.extend(tokens.into_iter().map(|t| TokenRow::new(&user, t))),
            Err(e) => {
                log::warn!("{}: unreadable tokens: {e}", user.primary_email);
                failed_items += 1;
            }
        }
    }
    log::info!(
        "Read {} users, {} tokens",
        fmt_num(users),
        fmt_num(rows.len())
    );

    let rows = write_report(output, &rows)?;
    Ok(PipelineSummary {
        name: "token analysis",
        report: output.to_path_buf(),
        rows,
        failed_items,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Report;
    use gwaudit_core::Enrichment;
    use gwaudit_google::model::User;

    fn user(email: &str) -> User {
        User {
            id: format!("id-{email}"),
            primary_email: email.to_string(),
            last_login_time: "2024-05-01T10:00:00.000Z".to_string(),
            ..Default::default()
        }
    }

    fn token(client: &str, scopes: &[&str]) -> Token {
        Token {
            client_id: client.to_string(),
            display_text: format!("{client} app"),
            kind: "admin#directory#token".to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn one_row_per_user_token_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join(UserRecord::FILE_NAME);
        let output = tmp.path().join(TokenRow::FILE_NAME);

        let users = vec![
            UserRecord::new(
                user("a@x"),
                Enrichment::Found(vec![token("c1", &["s1", "s2"]), token("c2", &[])]),
            ),
            UserRecord::new(user("b@x"), Enrichment::Empty),
            UserRecord::new(user("c@x"), Enrichment::Failed("HTTP 500".into())),
            UserRecord::new(user("d@x"), Enrichment::Found(vec![token("c3", &["s3"])])),
        ];
        write_report(&input, &users).unwrap();

        let summary = analyze_users(&input, &output).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.failed_items, 0);

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], TokenRow::HEADERS.join(","));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("a@x,"));
        assert!(lines[1].ends_with(",c1,c1 app,admin#directory#token,[s1 s2]"));
        assert!(lines[3].starts_with("d@x,"));
    }

    #[test]
    fn malformed_tokens_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join(UserRecord::FILE_NAME);
        let output = tmp.path().join(TokenRow::FILE_NAME);

        let mut broken = UserRecord::new(user("a@x"), Enrichment::Empty);
        broken.tokens = "[{not json".to_string();
        let ok = UserRecord::new(user("b@x"), Enrichment::Found(vec![token("c1", &["s"])]));
        write_report(&input, &[broken, ok]).unwrap();

        let summary = analyze_users(&input, &output).unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.failed_items, 1);
    }

    #[test]
    fn missing_input_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = analyze_users(&tmp.path().join("nope.csv"), &tmp.path().join("out.csv"));
        assert!(err.is_err());
    }
}
