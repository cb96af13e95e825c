// Integration tests for end-to-end report assembly and critical scenarios

#[cfg(test)]
mod integration_tests {
    use crate::batch::evaluate;
    use crate::lookback::LookbackWindow;
    use crate::observation::{InstrumentSeries, Observation};
    use crate::report::{build_group_report, ReportError, ReportOptions, ReturnTable};
    use crate::returns::compute_return;
    use crate::store::{InMemoryMarketStore, InstrumentRecord};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(symbol: &str, market_cap: Option<f64>) -> InstrumentRecord {
        InstrumentRecord {
            symbol: symbol.to_string(),
            company_name: Some(format!("{} Corp", symbol)),
            market_cap,
            pe_ratio: Some(15.0),
            revenue: Some(2.0e9),
        }
    }

    fn options_at(as_of: NaiveDate) -> ReportOptions {
        ReportOptions {
            as_of: Some(as_of),
            ..ReportOptions::default()
        }
    }

    /// Scenario A: [(2024-01-01, 100), (2024-02-01, 110)], one month -> 10.0
    #[test]
    fn one_month_return_on_exact_month_boundary() {
        let series = InstrumentSeries::from_observations(
            "A",
            vec![
                Observation::new(d(2024, 1, 1), 100.0, 10),
                Observation::new(d(2024, 2, 1), 110.0, 12),
            ],
        );
        let result = compute_return(&series, LookbackWindow::OneMonth);
        assert_eq!(result.value, Some(10.0));
    }

    /// Scenario B: a single-point series is absent for every window but
    /// still surfaces its one history point in the report.
    #[test]
    fn single_point_series_all_absent_with_one_history_point() {
        let mut store = InMemoryMarketStore::new();
        let id = store.add_industry("Utilities");
        store.add_instrument(id, record("SOLO", Some(1.0e9)));
        store.add_prices("SOLO", vec![(d(2024, 6, 1), 50.0, 700)]);

        let report = build_group_report(&store, "Utilities", &options_at(d(2024, 6, 1))).unwrap();
        let solo = &report.instruments[0];
        assert_eq!(solo.returns, ReturnTable::absent());
        assert_eq!(solo.history.len(), 1);
        assert_eq!(solo.history[0].close, 50.0);
        assert_eq!(solo.volume, 700);
    }

    /// Scenario D: an unresolvable industry name is NOT_FOUND, never EMPTY.
    #[test]
    fn unresolvable_industry_is_not_found() {
        let mut store = InMemoryMarketStore::new();
        let id = store.add_industry("Biotech");
        store.add_instrument(id, record("BIIB", Some(30.0e9)));

        let err = build_group_report(&store, "Zyzzyx", &ReportOptions::default()).unwrap_err();
        assert!(matches!(err, ReportError::GroupNotFound(_)));
    }

    /// Scenario E: a group with registered instruments but zero price rows
    /// yields a well-formed zero-valued report, not an error.
    #[test]
    fn priceless_group_yields_zero_valued_report() {
        let mut store = InMemoryMarketStore::new();
        let id = store.add_industry("Biotech");
        for symbol in ["AAA", "BBB", "CCC"] {
            store.add_instrument(id, record(symbol, Some(1.0e9)));
        }

        let report = build_group_report(&store, "Biotech", &ReportOptions::default()).unwrap();
        assert_eq!(report.ticker_count, 3);
        assert_eq!(report.instruments.len(), 3);
        assert!(report.concentration.labels.is_empty());
        assert!(report.concentration.values.is_empty());
        for metrics in &report.instruments {
            assert_eq!(metrics.returns, ReturnTable::absent());
        }
    }

    /// Batched evaluation must equal the direct calculator for every
    /// instrument and window of a mixed universe.
    #[test]
    fn batched_returns_equal_direct_returns_end_to_end() {
        let mut universe: BTreeMap<String, InstrumentSeries> = BTreeMap::new();
        universe.insert(
            "FULL".to_string(),
            InstrumentSeries::from_observations(
                "FULL",
                (0..500)
                    .map(|i| {
                        Observation::new(
                            d(2023, 1, 2) + chrono::Days::new(i),
                            100.0 + (i % 17) as f64,
                            1000,
                        )
                    })
                    .collect(),
            ),
        );
        universe.insert(
            "GAPPY".to_string(),
            InstrumentSeries::from_observations(
                "GAPPY",
                vec![
                    Observation::new(d(2023, 3, 1), 10.0, 1),
                    Observation::new(d(2023, 9, 15), 14.0, 1),
                    Observation::new(d(2024, 4, 2), 21.0, 1),
                ],
            ),
        );
        universe.insert("BARE".to_string(), InstrumentSeries::new("BARE"));

        let batched = evaluate(&universe, &LookbackWindow::ALL);
        for (symbol, series) in &universe {
            for window in LookbackWindow::ALL {
                assert_eq!(
                    batched[symbol].get(&window).copied().flatten(),
                    compute_return(series, window).value,
                    "{} {:?}",
                    symbol,
                    window
                );
            }
        }
    }

    /// Re-running the pipeline on an unchanged store yields byte-identical
    /// serialized reports.
    #[test]
    fn reports_are_idempotent_over_an_unchanged_store() {
        let mut store = InMemoryMarketStore::new();
        let id = store.add_industry("Airlines");
        store.add_instrument(id, record("DAL", Some(30.0e9)));
        store.add_instrument(id, record("UAL", Some(18.0e9)));
        store.add_instrument(id, record("LUV", None));
        for (symbol, base) in [("DAL", 40.0), ("UAL", 50.0), ("LUV", 25.0)] {
            let rows: Vec<(NaiveDate, f64, i64)> = (0..400)
                .map(|i| {
                    (
                        d(2023, 1, 2) + chrono::Days::new(i),
                        base + (i % 11) as f64,
                        1000 + i as i64,
                    )
                })
                .collect();
            store.add_prices(symbol, rows);
        }

        let options = options_at(d(2024, 2, 5));
        let first = build_group_report(&store, "Airlines", &options).unwrap();
        let second = build_group_report(&store, "Airlines", &options).unwrap();

        let first_json = serde_json::to_vec(&first).unwrap();
        let second_json = serde_json::to_vec(&second).unwrap();
        assert_eq!(first_json, second_json);
    }

    /// The report JSON carries the documented shape: nested returns keyed by
    /// window, date/close history points, parallel concentration arrays.
    #[test]
    fn report_serializes_with_the_documented_shape() {
        let mut store = InMemoryMarketStore::new();
        let id = store.add_industry("Tech");
        store.add_instrument(id, record("AAPL", Some(3.0e12)));
        store.add_prices(
            "AAPL",
            vec![
                (d(2024, 1, 2), 180.0, 100),
                (d(2024, 1, 3), 182.0, 110),
                (d(2024, 2, 2), 189.0, 120),
            ],
        );

        let report = build_group_report(&store, "Tech", &options_at(d(2024, 2, 2))).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["industry"], "Tech");
        assert_eq!(json["ticker_count"], 1);
        let instrument = &json["instruments"][0];
        assert_eq!(instrument["symbol"], "AAPL");
        let returns = &instrument["returns"];
        for key in ["1d", "1m", "2m", "3m", "6m", "12m", "ytd"] {
            assert!(returns.get(key).is_some(), "missing key {}", key);
        }
        // 1m: 189 vs 180 on 2024-01-02 -> 5%
        assert_eq!(returns["1m"], 5.0);
        assert_eq!(instrument["history"][0]["date"], "2024-01-02");
        assert_eq!(instrument["history"][0]["close"], 180.0);
        assert_eq!(
            json["concentration"]["labels"].as_array().unwrap().len(),
            json["concentration"]["values"].as_array().unwrap().len()
        );
    }

    /// A broken instrument (zero-coverage) never poisons its groupmates.
    #[test]
    fn partial_data_gaps_are_absorbed_per_instrument() {
        let mut store = InMemoryMarketStore::new();
        let id = store.add_industry("Mixed");
        store.add_instrument(id, record("GOOD", Some(10.0e9)));
        store.add_instrument(id, record("BROKEN", Some(5.0e9)));
        store.add_prices(
            "GOOD",
            vec![(d(2024, 1, 2), 100.0, 10), (d(2024, 2, 2), 105.0, 12)],
        );
        // BROKEN has no rows at all.

        let report = build_group_report(&store, "Mixed", &options_at(d(2024, 2, 2))).unwrap();
        let good = report.instruments.iter().find(|m| m.symbol == "GOOD").unwrap();
        let broken = report
            .instruments
            .iter()
            .find(|m| m.symbol == "BROKEN")
            .unwrap();

        assert_eq!(good.returns.one_month, Some(5.0));
        assert_eq!(broken.returns, ReturnTable::absent());
        // Both still count and both still rank in concentration.
        assert_eq!(report.ticker_count, 2);
        assert_eq!(report.concentration.labels, vec!["GOOD", "BROKEN"]);
    }
}
