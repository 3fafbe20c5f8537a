//! End-to-end checks of the bandit engine through its public API, the way the
//! experiment service layer drives it.

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use leadgen_core::{BanditConfig, BetaPrior, NoWinnerReason, VariantRecord, VariantState};
    use leadgen_rl_engine::{
        allocate_traffic, determine_winner, engine_rng, expected_loss, select_variant,
        variant_statistics, BanditEngine, BetaPosterior,
    };

    fn variant(id: &str, alpha: f64, beta: f64, impressions: u64, conversions: u64) -> VariantState {
        VariantState::new(id, format!("Variant {}", id), alpha, beta, impressions, conversions)
            .unwrap()
    }

    #[test]
    fn test_samples_and_percentiles_in_unit_interval() {
        let mut rng = engine_rng(Some(2024));
        for (alpha, beta) in [(0.5, 0.5), (1.0, 1.0), (2.0, 30.0), (75.0, 25.0)] {
            let posterior = BetaPosterior::new(alpha, beta).unwrap();
            for _ in 0..500 {
                let x = posterior.sample(&mut rng);
                assert!((0.0..=1.0).contains(&x));
            }
            for p in [0.0, 0.001, 0.25, 0.5, 0.75, 0.999, 1.0] {
                let q = posterior.percentile(p).unwrap();
                assert!((0.0..=1.0).contains(&q));
            }
        }
    }

    #[test]
    fn test_allocation_sums_to_one() {
        let mut rng = engine_rng(Some(1));
        let variants = vec![
            variant("A", 21.0, 181.0, 200, 20),
            variant("B", 26.0, 176.0, 200, 25),
            variant("C", 31.0, 171.0, 200, 30),
        ];
        let allocation = allocate_traffic(&variants, 100, 10_000, &mut rng).unwrap();
        assert_abs_diff_eq!(allocation.values().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(allocation["C"] > allocation["A"]);
    }

    #[test]
    fn test_fairness_under_equal_arms() {
        let mut rng = engine_rng(Some(7));
        let variants = vec![variant("A", 10.0, 90.0, 0, 0), variant("B", 10.0, 90.0, 0, 0)];
        let mut a_count = 0;
        for _ in 0..100 {
            if select_variant(&variants, 0.1, &mut rng).unwrap().variant_id == "A" {
                a_count += 1;
            }
        }
        let b_count = 100 - a_count;
        assert!(a_count > 20 && a_count < 80, "A selected {} times", a_count);
        assert!(b_count > 20 && b_count < 80, "B selected {} times", b_count);
    }

    #[test]
    fn test_correct_winner_under_clear_separation() {
        let mut rng = engine_rng(Some(99));
        let variants = vec![
            variant("A", 100.0, 100.0, 200, 100),
            variant("B", 20.0, 180.0, 200, 20),
        ];
        let analysis = determine_winner(&variants, 0.95, 100, &mut rng).unwrap();
        assert!(analysis.has_winner);
        assert_eq!(analysis.winner_id.as_deref(), Some("A"));
        assert!(analysis.confidence.unwrap() >= 0.95);
    }

    #[test]
    fn test_insufficient_data_gate() {
        let mut rng = engine_rng(Some(5));
        let variants = vec![
            variant("A", 19.0, 3.0, 20, 18),
            variant("B", 2.0, 200.0, 200, 1),
        ];
        let analysis = determine_winner(&variants, 0.95, 100, &mut rng).unwrap();
        assert!(!analysis.has_winner);
        assert_eq!(analysis.reason, Some(NoWinnerReason::InsufficientData));
    }

    #[test]
    fn test_expected_loss_ordering() {
        let mut rng = engine_rng(Some(17));
        let variants = vec![variant("A", 50.0, 50.0, 0, 0), variant("B", 30.0, 70.0, 0, 0)];
        let losses = expected_loss(&variants, 10_000, &mut rng).unwrap();
        assert!(losses["A"] >= 0.0);
        assert!(losses["B"] >= 0.0);
        assert!(losses["A"] < losses["B"]);
    }

    #[test]
    fn test_interval_monotonicity() {
        let small = variant_statistics(6.0, 14.0, 20, 6, 0.95).unwrap();
        let medium = variant_statistics(60.0, 140.0, 200, 60, 0.95).unwrap();
        let large = variant_statistics(600.0, 1400.0, 2000, 600, 0.95).unwrap();

        assert!(small.confidence_interval.width() > medium.confidence_interval.width());
        assert!(medium.confidence_interval.width() > large.confidence_interval.width());
        for stats in [&small, &medium, &large] {
            assert!(stats.confidence_interval.lower < stats.bayesian_estimate);
            assert!(stats.bayesian_estimate < stats.confidence_interval.upper);
        }
    }

    #[test]
    fn test_idempotence_under_seeding() {
        let variants = vec![
            variant("A", 12.0, 40.0, 50, 11),
            variant("B", 14.0, 38.0, 50, 13),
            variant("C", 9.0, 43.0, 50, 8),
        ];
        let first = select_variant(&variants, 0.1, &mut engine_rng(Some(314))).unwrap();
        let second = select_variant(&variants, 0.1, &mut engine_rng(Some(314))).unwrap();
        assert_eq!(first.variant_id, second.variant_id);
        assert_eq!(first.sampled_score, second.sampled_score);
    }

    #[test]
    fn test_variant_statistics_scenario() {
        let stats = variant_statistics(30.0, 70.0, 100, 30, 0.95).unwrap();
        assert_abs_diff_eq!(stats.conversion_rate, 0.30, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.bayesian_estimate, 0.30, epsilon = 1e-12);
        assert!(stats.confidence_interval.lower < 0.3);
        assert!(0.3 < stats.confidence_interval.upper);
    }

    #[test]
    fn test_experiment_lifecycle_through_engine() {
        let engine = BanditEngine::new(BanditConfig {
            num_simulations: 4_000,
            winner_num_simulations: 20_000,
            ..Default::default()
        })
        .unwrap();
        let mut rng = engine_rng(Some(4242));

        // Fresh experiment: uniform priors, no traffic yet.
        let mut variants: Vec<VariantState> = ["control", "challenger"]
            .iter()
            .map(|id| VariantState::from_counts(*id, *id, 0, 0, BetaPrior::uniform()).unwrap())
            .collect();

        let allocation = engine.allocate_traffic(&variants, &mut rng).unwrap();
        assert_abs_diff_eq!(allocation["control"], 0.5, epsilon = 1e-12);

        // Serve traffic with Thompson sampling; the challenger converts at 30%,
        // the control at 10%.
        for _ in 0..2_000 {
            let choice = engine.select_variant(&variants, &mut rng).unwrap();
            let idx = variants
                .iter()
                .position(|v| v.id == choice.variant_id)
                .unwrap();
            let rate = if variants[idx].id == "challenger" { 0.3 } else { 0.1 };
            let converted = rand::Rng::gen::<f64>(&mut rng) < rate;
            variants[idx].record_outcome(converted);
        }

        for v in &variants {
            v.check_consistency().unwrap();
        }
        let challenger = &variants[1];
        assert!(challenger.impressions > variants[0].impressions);

        let report = engine.report(&variants, &mut rng).unwrap();
        assert_eq!(report.total_impressions, 2_000);
        if variants[0].impressions >= 100 {
            assert!(report.winner.has_winner);
            assert_eq!(report.winner.winner_id.as_deref(), Some("challenger"));
        } else {
            assert_eq!(report.winner.reason, Some(NoWinnerReason::InsufficientData));
        }
        let c = report.variant("challenger").unwrap();
        let k = report.variant("control").unwrap();
        assert!(c.expected_loss < k.expected_loss);
        assert!(c.statistics.bayesian_estimate > k.statistics.bayesian_estimate);
    }

    #[test]
    fn test_partial_records_from_upstream() {
        let json = r#"[
            {"id": "hero-a", "name": "Hero A", "impressions": 300, "conversions": 45},
            {"id": "hero-b", "impressions": 300, "conversions": 60},
            {"id": "hero-c", "alpha": 2.5, "beta": 9.5}
        ]"#;
        let records: Vec<VariantRecord> = serde_json::from_str(json).unwrap();
        let engine = BanditEngine::new(BanditConfig::default()).unwrap();
        let variants = engine.states_from_records(records).unwrap();

        assert_eq!(variants[0].name, "Hero A");
        assert_eq!(variants[1].name, "hero-b");
        assert_eq!((variants[1].alpha, variants[1].beta), (61.0, 241.0));
        assert_eq!(variants[2].impressions, 0);

        let mut rng = engine_rng(Some(3));
        let allocation = engine.allocate_traffic(&variants, &mut rng).unwrap();
        // 600 total impressions clear the 100-per-variant guard, so the simulation runs.
        assert!(allocation["hero-b"] > allocation["hero-a"]);
    }
}
