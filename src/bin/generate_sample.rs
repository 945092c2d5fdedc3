use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use hospital_compare::config::PipelineConfig;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

const NOT_AVAILABLE: &str = "Not Available";

/// (Facility ID, Facility Name, State)
const FACILITIES: [(&str, &str, &str); 12] = [
    ("220031", "BOSTON MEDICAL CENTER", "MA"),
    ("220071", "MASSACHUSETTS GENERAL HOSPITAL", "MA"),
    ("220080", "CAMBRIDGE HEALTH ALLIANCE", "MA"),
    ("220077", "MOUNT AUBURN HOSPITAL", "MA"),
    ("220116", "TUFTS MEDICAL CENTER", "MA"),
    ("220171", "LAHEY HOSPITAL & MEDICAL CENTER, BURLINGTON", "MA"),
    ("330101", "NEW YORK-PRESBYTERIAN HOSPITAL", "NY"),
    ("330024", "MOUNT SINAI HOSPITAL", "NY"),
    ("330214", "NYU LANGONE HOSPITALS", "NY"),
    ("330005", "KALEIDA HEALTH", "NY"),
    ("010001", "SOUTHEAST HEALTH MEDICAL CENTER", "AL"),
    ("070022", "YALE-NEW HAVEN HOSPITAL", "CT"),
];

fn money(amount: f64) -> String {
    let whole = amount.round() as u64;
    let digits = whole.to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${out}")
}

fn writer(dir: &Path, file: &Path) -> Result<csv::Writer<std::fs::File>> {
    let path = dir.join(file);
    csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))
}

fn main() -> Result<()> {
    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let config = PipelineConfig::default();
    let mut rng = SimpleRng::new(42);

    // ---- Medicare spending per beneficiary ----
    let mut w = writer(&out_dir, &config.inputs.spending)?;
    w.write_record(["Facility ID", "Facility Name", "State", "Measure ID", "Measure Name", "Score"])?;
    for (i, &(id, name, state)) in FACILITIES.iter().enumerate() {
        let score = if rng.chance(0.1) {
            NOT_AVAILABLE.to_string()
        } else {
            format!("{:.2}", rng.uniform(0.85, 1.25))
        };
        // Pad a few names the way the published files occasionally do.
        let name = if i % 5 == 0 { format!(" {name} ") } else { name.to_string() };
        w.write_record([id, name.as_str(), state, "MSPB-1", "Medicare hospital spending per patient", score.as_str()])?;
    }
    w.flush()?;

    // ---- Complications and deaths, payments ----
    let mut outcomes = writer(&out_dir, &config.inputs.complications)?;
    let mut payments = writer(&out_dir, &config.inputs.payment)?;
    outcomes.write_record(["Facility ID", "Facility Name", "State", "Measure Name", "Score", "Denominator"])?;
    payments.write_record([
        "Facility ID",
        "Facility Name",
        "State",
        "Payment Measure Name",
        "Payment",
        "Denominator",
    ])?;
    for &(id, name, state) in &FACILITIES {
        for measure in &config.measures {
            let rate = if rng.chance(0.08) {
                NOT_AVAILABLE.to_string()
            } else {
                format!("{:.1}", rng.uniform(2.0, 18.0))
            };
            let cases = format!("{}", 50 + rng.next_u64() % 600);
            outcomes.write_record([id, name, state, measure.outcome.as_str(), rate.as_str(), cases.as_str()])?;

            let payment = if rng.chance(0.05) {
                NOT_AVAILABLE.to_string()
            } else {
                money(rng.uniform(14_000.0, 32_000.0))
            };
            payments.write_record([id, name, state, measure.payment.as_str(), payment.as_str(), cases.as_str()])?;
        }
    }
    // A second reporting period for one facility.
    let (id, name, state) = FACILITIES[0];
    let measure = &config.measures[0];
    payments.write_record([id, name, state, measure.payment.as_str(), money(21_500.0).as_str(), "140"])?;
    outcomes.flush()?;
    payments.flush()?;

    // ---- General information ----
    let mut w = writer(&out_dir, &config.inputs.hospital_info)?;
    w.write_record(["Facility ID", "Facility Name", "State", "Hospital overall rating"])?;
    for &(id, name, state) in &FACILITIES {
        let rating = if rng.chance(0.15) {
            NOT_AVAILABLE.to_string()
        } else {
            (1 + rng.next_u64() % 5).to_string()
        };
        w.write_record([id, name, state, rating.as_str()])?;
    }
    w.flush()?;

    println!(
        "Wrote {} facilities x {} measures to {}",
        FACILITIES.len(),
        config.measures.len(),
        out_dir.display()
    );
    Ok(())
}
