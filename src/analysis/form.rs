use tracing::debug;
use crate::analysis::types::{AnalysisParams, AnalysisType, ForecastMethod};
use crate::data::types::Metadata;

pub const DEFAULT_YEAR_START: i32 = 1990;
pub const DEFAULT_YEAR_END: i32 = 2019;
pub const DEFAULT_FORECAST_PERIOD: u32 = 5;

const SLIDER_MIN: u32 = 1;
const SLIDER_MAX: u32 = 10;

/// One control mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamUpdate {
    Target(String),
    Region(String),
    YearStart(i32),
    YearEnd(i32),
    ForecastPeriod(u32),
    Method(ForecastMethod),
    IntervalWidth(f64),
    YearlySeasonality(bool),
    Clusters(u32),
    /// Clustering and regression feature checkboxes
    Feature { name: String, enabled: bool },
    /// Correlation disorder checkboxes
    Disorder { name: String, enabled: bool },
    Sensitivity(u8),
}

impl ParamUpdate {
    fn key(&self) -> &'static str {
        match self {
            ParamUpdate::Target(_) => "target",
            ParamUpdate::Region(_) => "region",
            ParamUpdate::YearStart(_) => "year_start",
            ParamUpdate::YearEnd(_) => "year_end",
            ParamUpdate::ForecastPeriod(_) => "forecastPeriod",
            ParamUpdate::Method(_) => "method",
            ParamUpdate::IntervalWidth(_) => "intervalWidth",
            ParamUpdate::YearlySeasonality(_) => "yearlySeasonality",
            ParamUpdate::Clusters(_) => "nClusters",
            ParamUpdate::Feature { .. } => "features",
            ParamUpdate::Disorder { .. } => "disorders",
            ParamUpdate::Sensitivity(_) => "sensitivity",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamError {
    #[error("Parameter '{key}' does not apply to {analysis} analysis")]
    NotApplicable { key: &'static str, analysis: AnalysisType },

    #[error("Parameter '{key}' out of range: {value} (expected {min}..={max})")]
    OutOfRange { key: &'static str, value: u32, min: u32, max: u32 },
}

type Listener = Box<dyn FnMut(&AnalysisParams) + Send>;

/// Parameter state for the selected analysis type.
///
/// Every change goes through [`ParameterForm::update`] (or a type switch / metadata
/// seed) and is pushed to the listener, which is the only way parameters leave
/// the form.
pub struct ParameterForm {
    params: AnalysisParams,
    /// Most recently loaded metadata, reused when the type changes
    metadata: Option<Metadata>,
    on_change: Listener,
}

impl ParameterForm {
    pub fn new(analysis_type: AnalysisType, on_change: impl FnMut(&AnalysisParams) + Send + 'static) -> Self {
        Self {
            params: AnalysisParams::empty(analysis_type),
            metadata: None,
            on_change: Box::new(on_change),
        }
    }

    #[cfg(test)]
    pub fn params(&self) -> &AnalysisParams {
        &self.params
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.params.analysis_type()
    }

    /// Switch analysis type. Parameters of the previous type are discarded and
    /// the new type starts from the metadata defaults, if it has any.
    pub fn select(&mut self, analysis_type: AnalysisType) {
        debug!("Selected analysis type: {}", analysis_type);
        self.params = AnalysisParams::empty(analysis_type);
        self.seed_defaults();
        self.notify();
    }

    /// Keep `metadata` for later type switches and seed time-series defaults
    /// from it without touching fields the user set.
    pub fn apply_metadata(&mut self, metadata: &Metadata) {
        self.metadata = Some(metadata.clone());
        if self.seed_defaults() {
            self.notify();
        }
    }

    /// Fill unset time-series fields from the stored metadata. Returns whether
    /// anything was seeded.
    fn seed_defaults(&mut self) -> bool {
        let AnalysisParams::TimeSeries(settings) = &mut self.params else {
            return false;
        };
        let Some(metadata) = &self.metadata else {
            return false;
        };
        let Some(first_disorder) = metadata.disorders.first() else {
            return false;
        };

        let range = metadata.year_range;
        settings.target.get_or_insert_with(|| first_disorder.clone());
        settings.region.get_or_insert_with(|| "global".to_string());
        settings
            .year_start
            .get_or_insert(range.map(|r| r.min).unwrap_or(DEFAULT_YEAR_START));
        settings
            .year_end
            .get_or_insert(range.map(|r| r.max).unwrap_or(DEFAULT_YEAR_END));
        settings.forecast_period.get_or_insert(DEFAULT_FORECAST_PERIOD);
        settings.method.get_or_insert(ForecastMethod::Prophet);
        true
    }

    /// Merge one changed key into the current parameters
    pub fn update(&mut self, update: ParamUpdate) -> Result<(), ParamError> {
        let key = update.key();
        let analysis = self.analysis_type();
        let not_applicable = || ParamError::NotApplicable { key, analysis };

        match (&mut self.params, update) {
            (AnalysisParams::TimeSeries(s), ParamUpdate::Target(v)) => s.target = Some(v),
            (AnalysisParams::TimeSeries(s), ParamUpdate::Region(v)) => s.region = Some(v),
            (AnalysisParams::TimeSeries(s), ParamUpdate::YearStart(v)) => s.year_start = Some(v),
            (AnalysisParams::TimeSeries(s), ParamUpdate::YearEnd(v)) => s.year_end = Some(v),
            (AnalysisParams::TimeSeries(s), ParamUpdate::ForecastPeriod(v)) => {
                check_slider(key, v)?;
                s.forecast_period = Some(v);
            }
            (AnalysisParams::TimeSeries(s), ParamUpdate::Method(v)) => s.method = Some(v),
            (AnalysisParams::TimeSeries(s), ParamUpdate::IntervalWidth(v)) => s.interval_width = Some(v),
            (AnalysisParams::TimeSeries(s), ParamUpdate::YearlySeasonality(v)) => {
                s.yearly_seasonality = Some(v)
            }
            (AnalysisParams::Clustering(s), ParamUpdate::Clusters(v)) => s.n_clusters = Some(v),
            (AnalysisParams::Clustering(s), ParamUpdate::Feature { name, enabled }) => {
                toggle(&mut s.features, &name.to_lowercase(), enabled)
            }
            (AnalysisParams::Correlation(s), ParamUpdate::Disorder { name, enabled }) => {
                toggle(&mut s.disorders, &name.to_lowercase(), enabled)
            }
            (AnalysisParams::Regression(s), ParamUpdate::Target(v)) => s.target = Some(v),
            (AnalysisParams::Regression(s), ParamUpdate::Feature { name, enabled }) => {
                toggle(&mut s.features, &name, enabled)
            }
            (AnalysisParams::Anomaly(s), ParamUpdate::Target(v)) => s.target = Some(v),
            (AnalysisParams::Anomaly(s), ParamUpdate::Sensitivity(v)) => {
                check_slider(key, u32::from(v))?;
                s.sensitivity = Some(v);
            }
            _ => return Err(not_applicable()),
        }

        self.notify();
        Ok(())
    }

    fn notify(&mut self) {
        (self.on_change)(&self.params);
    }
}

fn check_slider(key: &'static str, value: u32) -> Result<(), ParamError> {
    if (SLIDER_MIN..=SLIDER_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ParamError::OutOfRange { key, value, min: SLIDER_MIN, max: SLIDER_MAX })
    }
}

fn toggle(list: &mut Vec<String>, name: &str, enabled: bool) {
    if enabled {
        if !list.iter().any(|item| item == name) {
            list.push(name.to_string());
        }
    } else {
        list.retain(|item| item != name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{ClusteringSettings, TimeSeriesSettings};
    use crate::data::types::YearRange;
    use std::sync::{Arc, Mutex};

    fn recording_form(analysis_type: AnalysisType) -> (ParameterForm, Arc<Mutex<Vec<AnalysisParams>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let form = ParameterForm::new(analysis_type, move |params: &AnalysisParams| {
            sink.lock().unwrap().push(params.clone())
        });
        (form, seen)
    }

    fn metadata() -> Metadata {
        Metadata {
            disorders: vec!["Ansiedade".to_string(), "Depressão".to_string()],
            countries: vec![],
            regions: vec!["global".to_string()],
            year_range: Some(YearRange { min: 1995, max: 2020 }),
        }
    }

    #[test]
    fn test_metadata_seeds_time_series_defaults() {
        let (mut form, seen) = recording_form(AnalysisType::TimeSeries);

        form.apply_metadata(&metadata());

        let expected = AnalysisParams::TimeSeries(TimeSeriesSettings {
            target: Some("Ansiedade".to_string()),
            region: Some("global".to_string()),
            year_start: Some(1995),
            year_end: Some(2020),
            forecast_period: Some(5),
            method: Some(ForecastMethod::Prophet),
            ..Default::default()
        });
        assert_eq!(form.params(), &expected);
        assert_eq!(seen.lock().unwrap().last(), Some(&expected));
    }

    #[test]
    fn test_defaults_keep_user_choices() {
        let (mut form, _) = recording_form(AnalysisType::TimeSeries);
        form.update(ParamUpdate::Target("Depressão".to_string())).unwrap();
        form.update(ParamUpdate::ForecastPeriod(8)).unwrap();

        form.apply_metadata(&metadata());

        let AnalysisParams::TimeSeries(settings) = form.params() else {
            panic!("expected time series params");
        };
        assert_eq!(settings.target.as_deref(), Some("Depressão"));
        assert_eq!(settings.forecast_period, Some(8));
        assert_eq!(settings.year_start, Some(1995));
    }

    #[test]
    fn test_defaults_need_metadata_with_disorders() {
        let (mut form, seen) = recording_form(AnalysisType::TimeSeries);

        form.apply_metadata(&Metadata::default());

        assert_eq!(form.params(), &AnalysisParams::empty(AnalysisType::TimeSeries));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_year_bounds_fall_back_without_range() {
        let (mut form, _) = recording_form(AnalysisType::TimeSeries);
        let mut metadata = metadata();
        metadata.year_range = None;

        form.apply_metadata(&metadata);

        let AnalysisParams::TimeSeries(settings) = form.params() else {
            panic!("expected time series params");
        };
        assert_eq!(settings.year_start, Some(DEFAULT_YEAR_START));
        assert_eq!(settings.year_end, Some(DEFAULT_YEAR_END));
    }

    #[test]
    fn test_metadata_ignored_for_other_types() {
        let (mut form, _) = recording_form(AnalysisType::Clustering);

        form.apply_metadata(&metadata());

        assert_eq!(form.params(), &AnalysisParams::empty(AnalysisType::Clustering));
    }

    #[test]
    fn test_switching_type_discards_previous_params() {
        let (mut form, seen) = recording_form(AnalysisType::TimeSeries);
        form.apply_metadata(&metadata());
        form.update(ParamUpdate::Region("Americas".to_string())).unwrap();

        form.select(AnalysisType::Clustering);
        assert_eq!(form.params(), &AnalysisParams::empty(AnalysisType::Clustering));

        form.select(AnalysisType::TimeSeries);
        let AnalysisParams::TimeSeries(settings) = form.params() else {
            panic!("expected time series params");
        };
        assert_eq!(settings.region.as_deref(), Some("global"));
        assert_eq!(settings.target.as_deref(), Some("Ansiedade"));
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_select_seeds_defaults_from_earlier_metadata() {
        let (mut form, seen) = recording_form(AnalysisType::Clustering);
        form.apply_metadata(&metadata());
        assert!(seen.lock().unwrap().is_empty());

        form.select(AnalysisType::TimeSeries);

        assert_eq!(
            form.params().to_json(),
            r#"{"type":"timeSeries","target":"Ansiedade","region":"global","year_start":1995,"year_end":2020,"forecastPeriod":5,"method":"prophet"}"#
        );
        assert_eq!(form.params().target(), Some("Ansiedade"));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(seen.lock().unwrap().last(), Some(form.params()));
    }

    #[test]
    fn test_select_without_metadata_stays_empty() {
        let (mut form, seen) = recording_form(AnalysisType::Anomaly);

        form.select(AnalysisType::TimeSeries);

        assert_eq!(form.params().to_json(), r#"{"type":"timeSeries"}"#);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_update_notifies_with_merged_params() {
        let (mut form, seen) = recording_form(AnalysisType::Clustering);

        form.update(ParamUpdate::Clusters(4)).unwrap();
        form.update(ParamUpdate::Feature { name: "Ansiedade".to_string(), enabled: true }).unwrap();
        form.update(ParamUpdate::Feature { name: "Bipolar".to_string(), enabled: true }).unwrap();
        form.update(ParamUpdate::Feature { name: "ansiedade".to_string(), enabled: false }).unwrap();

        let expected = AnalysisParams::Clustering(ClusteringSettings {
            n_clusters: Some(4),
            features: vec!["bipolar".to_string()],
        });
        assert_eq!(seen.lock().unwrap().last(), Some(&expected));
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_update_rejects_foreign_key() {
        let (mut form, seen) = recording_form(AnalysisType::Correlation);

        let err = form.update(ParamUpdate::Method(ForecastMethod::Arima)).unwrap_err();

        assert_eq!(err, ParamError::NotApplicable { key: "method", analysis: AnalysisType::Correlation });
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_slider_bounds() {
        let (mut form, _) = recording_form(AnalysisType::Anomaly);

        assert!(form.update(ParamUpdate::Sensitivity(10)).is_ok());
        assert_eq!(
            form.update(ParamUpdate::Sensitivity(11)),
            Err(ParamError::OutOfRange { key: "sensitivity", value: 11, min: 1, max: 10 })
        );

        form.select(AnalysisType::TimeSeries);
        assert!(form.update(ParamUpdate::ForecastPeriod(0)).is_err());
    }
}
