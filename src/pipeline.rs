use crate::color::ColorMap;
use crate::config::PipelineConfig;
use crate::data::filter::{coerce, filter_and_coerce, filter_rows, value_set, CoercionRule, FilterState};
use crate::data::join::{inner_join, KeyPair};
use crate::data::loader::{load_csv, write_csv};
use crate::data::mapper::map_category;
use crate::data::model::Dataset;
use crate::data::rank::{group_max, partition, rank_within_groups};
use crate::error::{DataError, PipelineError};

/// Column names used by the CMS hospital tables and the derived views.
pub mod columns {
    pub const FACILITY_ID: &str = "Facility ID";
    pub const FACILITY_NAME: &str = "Facility Name";
    pub const STATE: &str = "State";
    pub const SCORE: &str = "Score";
    pub const MEASURE_NAME: &str = "Measure Name";
    pub const PAYMENT_MEASURE_NAME: &str = "Payment Measure Name";
    pub const PAYMENT: &str = "Payment";
    pub const OVERALL_RATING: &str = "Hospital overall rating";
    pub const COLOR: &str = "Color";
    pub const RANK: &str = "Rank";
}

use columns::*;

pub const OUTCOME_PAYMENT_FILE: &str = "merged_outcome_payment.csv";
pub const DISPLAY_FILE: &str = "filtered_for_display.csv";
pub const SPENDING_FILE: &str = "spending_by_state.csv";
pub const SPENDING_RATING_FILE: &str = "spending_vs_rating.csv";

// ---------------------------------------------------------------------------
// Inputs and outputs of a run
// ---------------------------------------------------------------------------

/// The four raw tables, exactly as loaded.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub spending: Dataset,
    pub complications: Dataset,
    pub payment: Dataset,
    pub hospital_info: Dataset,
}

impl SourceTables {
    /// Load every input file.  The first unreadable file aborts the run.
    pub fn load(config: &PipelineConfig) -> Result<Self, DataError> {
        let inputs = &config.inputs;
        Ok(Self {
            spending: load_csv(&config.input_path(&inputs.spending))?,
            complications: load_csv(&config.input_path(&inputs.complications))?,
            payment: load_csv(&config.input_path(&inputs.payment))?,
            hospital_info: load_csv(&config.input_path(&inputs.hospital_info))?,
        })
    }
}

/// Every derived view of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Spending per beneficiary for the selected states, coloured and ranked
    /// within each state.
    pub spending_by_state: Dataset,
    /// Outcome measures joined with their payment measures; numeric score and
    /// payment, missing where unparsable.
    pub outcome_payment: Dataset,
    /// Selected hospitals in the selected states, with numeric score and
    /// payment and a colour.
    pub display: Dataset,
    /// Spending joined with the overall star rating.
    pub spending_rating: Dataset,
}

/// One facet of the state × measure scatter grid.
#[derive(Debug, Clone)]
pub struct Panel {
    pub state: String,
    pub measure: String,
    pub rows: Dataset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateSummary {
    pub state: String,
    pub facilities: usize,
    pub max_score: Option<f64>,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Trim facility names and drop rows without one.
pub fn clean_facility_names(dataset: &Dataset) -> Dataset {
    dataset
        .trim_text(FACILITY_NAME)
        .drop_missing(&[FACILITY_NAME])
}

fn state_filter(config: &PipelineConfig) -> FilterState {
    let mut filters = FilterState::new();
    filters.insert(STATE.to_string(), config.selected_states.clone());
    filters
}

/// Spending per beneficiary in the selected states, sorted descending by
/// score within each state, with a colour and a per-state rank.
pub fn spending_view(spending: &Dataset, config: &PipelineConfig, colors: &ColorMap) -> Dataset {
    let typed = filter_and_coerce(
        &clean_facility_names(spending),
        &state_filter(config),
        &[CoercionRule::decimal(SCORE)],
    )
    .drop_missing(&[SCORE]);
    let colored = colors.assign(&typed, FACILITY_NAME, COLOR);
    rank_within_groups(&colored, STATE, SCORE, RANK)
        .select(&[FACILITY_ID, FACILITY_NAME, STATE, SCORE, COLOR, RANK])
}

/// Join outcome measures with their payment measures on facility and mapped
/// measure name.  The outcome side supplies `State` and `Facility Name`;
/// `Score` and `Payment` come out numeric, with unparsable values kept as
/// missing rather than dropped.
pub fn join_outcome_payment(complications: &Dataset, payment: &Dataset, config: &PipelineConfig) -> Dataset {
    let mut measure_filter = FilterState::new();
    measure_filter.insert(MEASURE_NAME.to_string(), value_set(config.outcome_measures()));

    let outcomes = filter_rows(&clean_facility_names(complications), &measure_filter);
    let outcomes = map_category(
        &outcomes,
        MEASURE_NAME,
        PAYMENT_MEASURE_NAME,
        &config.measure_mapping(),
        None,
    )
    .drop_missing(&[PAYMENT_MEASURE_NAME]);

    let joined = inner_join(
        &outcomes,
        &clean_facility_names(payment),
        &[
            KeyPair::same(FACILITY_ID),
            KeyPair::same(PAYMENT_MEASURE_NAME),
        ],
    );
    coerce(&joined, &outcome_payment_rules())
}

fn outcome_payment_rules() -> [CoercionRule; 2] {
    [CoercionRule::decimal(SCORE), CoercionRule::currency(PAYMENT)]
}

/// The selected hospitals in the selected states, with numeric score and
/// payment.  Rows missing either number are dropped.
pub fn display_subset(joined: &Dataset, config: &PipelineConfig, colors: &ColorMap) -> Dataset {
    let mut filters = state_filter(config);
    filters.insert(
        FACILITY_NAME.to_string(),
        value_set(config.selected_hospitals.iter().map(|h| h.trim())),
    );
    let typed = filter_and_coerce(joined, &filters, &outcome_payment_rules())
        .drop_missing(&[SCORE, PAYMENT]);
    colors.assign(&typed, FACILITY_NAME, COLOR)
}

/// Spending joined with the overall star rating, one row per facility
/// present in both tables.  Facilities without a spending score are dropped;
/// a missing rating is kept.
pub fn join_spending_rating(spending: &Dataset, hospital_info: &Dataset) -> Dataset {
    let spending = coerce(&clean_facility_names(spending), &[CoercionRule::decimal(SCORE)])
        .drop_missing(&[SCORE]);
    let info = coerce(
        &clean_facility_names(hospital_info),
        &[CoercionRule::ordinal(OVERALL_RATING, 1, 5)],
    );
    inner_join(&spending, &info, &[KeyPair::same(FACILITY_ID)])
        .select(&[FACILITY_ID, FACILITY_NAME, STATE, SCORE, OVERALL_RATING])
}

/// Split the display subset into state × measure panels, states in
/// configured order then measures in configured order.  Panels with no rows
/// are kept so the grid shape never changes.
pub fn facet_panels(display: &Dataset, config: &PipelineConfig) -> Vec<Panel> {
    let measures = config.outcome_measures();
    partition(display, STATE, &config.state_order())
        .into_iter()
        .flat_map(|(state, by_state)| {
            partition(&by_state, MEASURE_NAME, &measures)
                .into_iter()
                .map(move |(measure, rows)| Panel {
                    state: state.clone(),
                    measure,
                    rows,
                })
        })
        .collect()
}

/// Facility count and top spending score per state.
pub fn summarize(spending_by_state: &Dataset) -> Vec<StateSummary> {
    let counts = group_max(spending_by_state, STATE, RANK);
    group_max(spending_by_state, STATE, SCORE)
        .into_iter()
        .zip(counts)
        .map(|((state, max_score), (_, max_rank))| StateSummary {
            state: state.to_field(),
            facilities: max_rank.map_or(0, |r| r as usize),
            max_score,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Whole run
// ---------------------------------------------------------------------------

/// Compute every derived view from already loaded tables.
pub fn compute(sources: &SourceTables, config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    let colors = ColorMap::from_config(config)?;

    let spending_by_state = spending_view(&sources.spending, config, &colors);
    let outcome_payment = join_outcome_payment(&sources.complications, &sources.payment, config);
    let display = display_subset(&outcome_payment, config, &colors);
    let spending_rating = join_spending_rating(&sources.spending, &sources.hospital_info);

    log::info!(
        "derived views: spending {} rows, outcome/payment {} rows, display {} rows, rating {} rows",
        spending_by_state.len(),
        outcome_payment.len(),
        display.len(),
        spending_rating.len()
    );

    Ok(PipelineOutput {
        spending_by_state,
        outcome_payment,
        display,
        spending_rating,
    })
}

/// Load the inputs named by `config` and compute every view.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput, PipelineError> {
    let sources = SourceTables::load(config)?;
    compute(&sources, config)
}

/// Write every derived view under `config.output_dir`, replacing old files.
pub fn write_outputs(output: &PipelineOutput, config: &PipelineConfig) -> Result<(), DataError> {
    write_csv(&output.outcome_payment, &config.output_path(OUTCOME_PAYMENT_FILE))?;
    write_csv(&output.display, &config.output_path(DISPLAY_FILE))?;
    write_csv(&output.spending_by_state, &config.output_path(SPENDING_FILE))?;
    write_csv(&output.spending_rating, &config.output_path(SPENDING_RATING_FILE))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;
    use crate::data::model::{cell, Cell};
    use std::path::Path;

    const SPENDING: &str = "\
Facility ID,Facility Name,State,Measure Name,Score
220031, BOSTON MEDICAL CENTER ,MA,Medicare hospital spending per patient,1.05
220071,MASSACHUSETTS GENERAL HOSPITAL,MA,Medicare hospital spending per patient,0.98
220077,MOUNT AUBURN HOSPITAL,MA,Medicare hospital spending per patient,Not Available
330101,NEW YORK-PRESBYTERIAN HOSPITAL,NY,Medicare hospital spending per patient,1.12
010001,SOUTHEAST HEALTH MEDICAL CENTER,AL,Medicare hospital spending per patient,0.97
220999,,MA,Medicare hospital spending per patient,1.50
";

    const COMPLICATIONS: &str = "\
Facility ID,Facility Name,State,Measure Name,Score,Denominator
220031,BOSTON MEDICAL CENTER,MA,Death rate for pneumonia patients,15.2,420
220031,BOSTON MEDICAL CENTER,MA,Death rate for stroke patients,13.0,210
220071,  MASSACHUSETTS GENERAL HOSPITAL ,MA,Death rate for heart attack patients,11.8,600
330101,NEW YORK-PRESBYTERIAN HOSPITAL,NY,Death rate for pneumonia patients,Not Available,80
220080,   ,MA,Death rate for pneumonia patients,9.9,100
330024,MOUNT SINAI HOSPITAL,NY,Death rate for pneumonia patients,10.1,90
";

    const PAYMENT_CSV: &str = "\
Facility ID,Facility Name,State,Payment Measure Name,Payment,Denominator
220031,Boston Medical Ctr,ZZ,Payment for pneumonia patients,\"$18,950\",55
220071,MASSACHUSETTS GENERAL HOSPITAL,MA,Payment for heart attack patients,\"$27,001.50\",66
330101,NEW YORK-PRESBYTERIAN HOSPITAL,NY,Payment for pneumonia patients,\"$19,100\",77
220031,BOSTON MEDICAL CENTER,MA,Payment for heart failure patients,\"$17,200\",88
220080,CAMBRIDGE HEALTH ALLIANCE,MA,Payment for pneumonia patients,\"$15,000\",10
330024,,NY,Payment for pneumonia patients,\"$16,000\",11
";

    const HOSPITAL_INFO: &str = "\
Facility ID,Facility Name,State,Hospital overall rating
220031,BOSTON MEDICAL CENTER,MA,3
220071,MASSACHUSETTS GENERAL HOSPITAL,MA,5
330101,NEW YORK-PRESBYTERIAN HOSPITAL,NY,Not Available
";

    fn sources() -> SourceTables {
        let parse = |text: &str| read_csv(text.as_bytes(), Path::new("fixture.csv")).unwrap();
        SourceTables {
            spending: parse(SPENDING),
            complications: parse(COMPLICATIONS),
            payment: parse(PAYMENT_CSV),
            hospital_info: parse(HOSPITAL_INFO),
        }
    }

    fn texts(ds: &Dataset, column: &str) -> Vec<String> {
        ds.column_values(column).iter().map(|c| c.to_field()).collect()
    }

    #[test]
    fn spending_view_is_sorted_coloured_and_ranked() {
        let config = PipelineConfig::default();
        let colors = ColorMap::from_config(&config).unwrap();
        let view = spending_view(&sources().spending, &config, &colors);

        assert_eq!(
            texts(&view, FACILITY_NAME),
            vec![
                "BOSTON MEDICAL CENTER",
                "MASSACHUSETTS GENERAL HOSPITAL",
                "NEW YORK-PRESBYTERIAN HOSPITAL"
            ]
        );
        assert_eq!(texts(&view, COLOR), vec!["red", "green", "lightgrey"]);
        assert_eq!(texts(&view, RANK), vec!["1", "2", "1"]);
    }

    #[test]
    fn unparsable_score_is_dropped_from_view_but_kept_raw() {
        let config = PipelineConfig::default();
        let colors = ColorMap::from_config(&config).unwrap();
        let src = sources();
        let view = spending_view(&src.spending, &config, &colors);

        assert!(!texts(&view, FACILITY_NAME).contains(&"MOUNT AUBURN HOSPITAL".to_string()));
        assert_eq!(src.spending.len(), 6);
        assert_eq!(
            cell(&src.spending.rows[2], SCORE),
            &Cell::from("Not Available")
        );
    }

    #[test]
    fn outcome_payment_join_matches_on_mapped_measure() {
        let src = sources();
        let joined = join_outcome_payment(&src.complications, &src.payment, &PipelineConfig::default());

        // Stroke is not a configured measure; heart failure has no outcome row.
        assert_eq!(texts(&joined, FACILITY_ID), vec!["220031", "220071", "330101"]);
        assert_eq!(
            texts(&joined, PAYMENT_MEASURE_NAME),
            vec![
                "Payment for pneumonia patients",
                "Payment for heart attack patients",
                "Payment for pneumonia patients"
            ]
        );
    }

    #[test]
    fn joined_rows_carry_outcome_side_state_and_name() {
        let src = sources();
        let joined = join_outcome_payment(&src.complications, &src.payment, &PipelineConfig::default());
        let row = &joined.rows[0];
        assert_eq!(cell(row, STATE), &Cell::from("MA"));
        assert_eq!(cell(row, FACILITY_NAME), &Cell::from("BOSTON MEDICAL CENTER"));
        assert_eq!(cell(row, "Denominator"), &Cell::from("420"));
        assert_eq!(cell(row, PAYMENT), &Cell::Number(18950.0));
    }

    #[test]
    fn outcome_payment_join_is_numeric_and_keeps_unparsable_rows() {
        let src = sources();
        let joined = join_outcome_payment(&src.complications, &src.payment, &PipelineConfig::default());
        assert_eq!(cell(&joined.rows[0], SCORE), &Cell::Number(15.2));
        assert_eq!(cell(&joined.rows[1], PAYMENT), &Cell::Number(27001.5));
        // "Not Available" becomes missing but the row stays in the table.
        assert_eq!(cell(&joined.rows[2], FACILITY_ID), &Cell::from("330101"));
        assert!(cell(&joined.rows[2], SCORE).is_missing());
        assert_eq!(cell(&joined.rows[2], PAYMENT), &Cell::Number(19100.0));
    }

    #[test]
    fn nameless_rows_are_excluded_before_joining() {
        let src = sources();
        let joined = join_outcome_payment(&src.complications, &src.payment, &PipelineConfig::default());
        let ids = texts(&joined, FACILITY_ID);
        // 220080 has a blank name on the outcome side, 330024 on the payment side.
        assert!(!ids.contains(&"220080".to_string()));
        assert!(!ids.contains(&"330024".to_string()));
        assert_eq!(
            cell(&joined.rows[1], FACILITY_NAME),
            &Cell::from("MASSACHUSETTS GENERAL HOSPITAL")
        );
    }

    #[test]
    fn display_subset_keeps_selected_hospitals_with_numbers() {
        let config = PipelineConfig::default();
        let colors = ColorMap::from_config(&config).unwrap();
        let src = sources();
        let joined = join_outcome_payment(&src.complications, &src.payment, &config);
        let display = display_subset(&joined, &config, &colors);

        assert_eq!(
            texts(&display, FACILITY_NAME),
            vec!["BOSTON MEDICAL CENTER", "MASSACHUSETTS GENERAL HOSPITAL"]
        );
        assert_eq!(cell(&display.rows[1], PAYMENT), &Cell::Number(27001.5));
        assert_eq!(cell(&display.rows[0], SCORE), &Cell::Number(15.2));
        assert_eq!(texts(&display, COLOR), vec!["red", "green"]);
    }

    #[test]
    fn spending_rating_join_keeps_missing_ratings() {
        let src = sources();
        let joined = join_spending_rating(&src.spending, &src.hospital_info);
        assert_eq!(
            joined.columns,
            vec![FACILITY_ID, FACILITY_NAME, STATE, SCORE, OVERALL_RATING]
        );
        assert_eq!(texts(&joined, FACILITY_ID), vec!["220031", "220071", "330101"]);
        assert_eq!(texts(&joined, OVERALL_RATING), vec!["3", "5", ""]);
    }

    #[test]
    fn panels_cover_every_state_and_measure() {
        let config = PipelineConfig::default();
        let output = compute(&sources(), &config).unwrap();
        let panels = facet_panels(&output.display, &config);

        assert_eq!(panels.len(), 8);
        assert_eq!(panels[0].state, "MA");
        assert_eq!(panels[4].state, "NY");
        let filled: Vec<(&str, &str)> = panels
            .iter()
            .filter(|p| !p.rows.is_empty())
            .map(|p| (p.state.as_str(), p.measure.as_str()))
            .collect();
        assert_eq!(
            filled,
            vec![
                ("MA", "Death rate for heart attack patients"),
                ("MA", "Death rate for pneumonia patients"),
            ]
        );
    }

    #[test]
    fn summary_counts_facilities_per_state() {
        let config = PipelineConfig::default();
        let output = compute(&sources(), &config).unwrap();
        assert_eq!(
            summarize(&output.spending_by_state),
            vec![
                StateSummary {
                    state: "MA".into(),
                    facilities: 2,
                    max_score: Some(1.05)
                },
                StateSummary {
                    state: "NY".into(),
                    facilities: 1,
                    max_score: Some(1.12)
                },
            ]
        );
    }

    #[test]
    fn no_matching_state_gives_empty_views() {
        let config = PipelineConfig {
            selected_states: value_set(["WY"]),
            ..Default::default()
        };
        let output = compute(&sources(), &config).unwrap();
        assert!(output.spending_by_state.is_empty());
        assert!(output.display.is_empty());
        assert!(facet_panels(&output.display, &config)
            .iter()
            .all(|p| p.rows.is_empty()));
        assert!(summarize(&output.spending_by_state).is_empty());
    }

    #[test]
    fn run_reads_inputs_and_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            data_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        for (file, text) in [
            (&config.inputs.spending, SPENDING),
            (&config.inputs.complications, COMPLICATIONS),
            (&config.inputs.payment, PAYMENT_CSV),
            (&config.inputs.hospital_info, HOSPITAL_INFO),
        ] {
            std::fs::write(config.input_path(file), text).unwrap();
        }

        let output = run(&config).unwrap();
        write_outputs(&output, &config).unwrap();

        let rules = outcome_payment_rules();
        let reloaded = coerce(&load_csv(&config.output_path(OUTCOME_PAYMENT_FILE)).unwrap(), &rules);
        assert_eq!(reloaded, output.outcome_payment);

        let display = coerce(&load_csv(&config.output_path(DISPLAY_FILE)).unwrap(), &rules);
        assert_eq!(display, output.display);
    }

    #[test]
    fn malformed_input_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        std::fs::write(config.input_path(&config.inputs.spending), "a,b\n1\n").unwrap();
        let err = run(&config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Data(DataError::MalformedInput { line: 2, .. })
        ));
    }
}
