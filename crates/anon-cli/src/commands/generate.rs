//! `anonymize generate` command implementation
//!
//! Produces a people CSV with the columns `first_name`, `last_name`,
//! `address` and `date_of_birth`, suitable as tokenizer input.

use anon_common::{AnonError, Result};
use chrono::{Duration, NaiveDate};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub const HEADERS: [&str; 4] = ["first_name", "last_name", "address", "date_of_birth"];

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Vivaan", "Aditya", "Vihaan", "Arjun", "Sai", "Reyansh", "Ayaan", "Krishna", "Ishaan",
    "Shaurya", "Atharv", "Dhruv", "Kabir", "Ritvik", "Nishant", "Aryan", "Laksh", "Shivansh",
    "Tanmay",
];

const LAST_NAMES: &[&str] = &[
    "Patel", "Sharma", "Reddy", "Naidu", "Kumar", "Jain", "Mehta", "Nair", "Singh", "Yadav",
    "Choudhary", "Gupta", "Pandey", "Joshi", "Agrawal", "Kapoor", "Verma", "Sinha", "Thakur", "Rao",
];

const ADDRESSES: &[&str] = &[
    "123 MG Road",
    "456 Nehru Street",
    "789 Tagore Lane",
    "101 Patel Marg",
    "202 Gandhi Avenue",
    "303 Ambedkar Road",
    "404 Nehru Nagar",
    "505 Vivekananda Path",
    "606 Indira Colony",
    "707 Tilak Nagar",
    "808 Patel Lane",
    "909 Ambedkar Colony",
    "1010 Gandhi Nagar",
    "1111 Nehru Street",
    "1212 Tagore Path",
    "1313 Patel Nagar",
    "1414 Gandhi Path",
    "1515 Ambedkar Lane",
    "1616 Nehru Marg",
    "1717 Vivekananda Street",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Write `num_records` random rows to `file`
///
/// Missing parent directories are created. With a `seed` the output is
/// reproducible.
pub fn run(file: &Path, num_records: u64, seed: Option<u64>) -> Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut writer = csv::Writer::from_path(file)?;
    write_records(&mut writer, num_records, &mut rng)?;
    writer.flush()?;

    info!(path = %file.display(), num_records, "Generated test data");
    println!(
        "{} CSV file '{}' generated with {} records",
        "✓".green(),
        file.display(),
        num_records
    );
    Ok(())
}

/// Write the header and `num_records` rows drawn from `rng`
pub fn write_records<W: Write, R: Rng>(
    writer: &mut csv::Writer<W>,
    num_records: u64,
    rng: &mut R,
) -> Result<()> {
    let (earliest, latest) = birth_date_range()?;
    let span_days = (latest - earliest).num_days();

    writer.write_record(HEADERS)?;
    for _ in 0..num_records {
        let date_of_birth = earliest + Duration::days(rng.random_range(0..=span_days));
        let date_of_birth = date_of_birth.format(DATE_FORMAT).to_string();
        writer.write_record([
            pick(FIRST_NAMES, rng),
            pick(LAST_NAMES, rng),
            pick(ADDRESSES, rng),
            date_of_birth.as_str(),
        ])?;
    }
    Ok(())
}

fn birth_date_range() -> Result<(NaiveDate, NaiveDate)> {
    let earliest = NaiveDate::from_ymd_opt(1970, 1, 1);
    let latest = NaiveDate::from_ymd_opt(2000, 12, 31);
    earliest
        .zip(latest)
        .ok_or_else(|| AnonError::config("invalid birth date range"))
}

fn pick<'a, R: Rng>(options: &[&'a str], rng: &mut R) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn generate(num_records: u64, seed: u64) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut rng = StdRng::seed_from_u64(seed);
        write_records(&mut writer, num_records, &mut rng).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_and_row_count() {
        let data = generate(25, 1);
        let mut reader = csv::Reader::from_reader(data.as_bytes());

        assert_eq!(reader.headers().unwrap(), &csv::StringRecord::from(HEADERS.to_vec()));
        assert_eq!(reader.records().count(), 25);
    }

    #[test]
    fn test_seed_is_reproducible() {
        assert_eq!(generate(50, 42), generate(50, 42));
        assert_ne!(generate(50, 42), generate(50, 43));
    }

    #[test]
    fn test_values_come_from_known_sets() {
        let data = generate(200, 7);
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let (earliest, latest) = birth_date_range().unwrap();

        for record in reader.records() {
            let record = record.unwrap();
            assert!(FIRST_NAMES.contains(&&record[0]));
            assert!(LAST_NAMES.contains(&&record[1]));
            assert!(ADDRESSES.contains(&&record[2]));

            let dob = NaiveDate::parse_from_str(&record[3], DATE_FORMAT).unwrap();
            assert!(dob >= earliest && dob <= latest);
        }
    }

    #[test]
    fn test_run_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data/nested/people.csv");

        run(&file, 3, Some(9)).unwrap();

        let contents = fs::read_to_string(&file).unwrap();
        assert_eq!(contents.lines().count(), 4);
    }
}
