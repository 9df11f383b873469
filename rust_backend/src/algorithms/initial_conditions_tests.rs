#[cfg(test)]
mod tests {
    use crate::algorithms::initial_conditions::InitialValues;
    use crate::config::settings::EstimationSettings;
    use crate::core::domain::{CaseObservation, RegionId};
    use crate::preprocessing::assembler::{AssembledModel, ModelDataAssembler};
    use crate::transformations::cleaning::CaseCleaner;
    use chrono::{Duration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Helper to assemble a 40-day growing series under the given settings
    fn assembled(toml: &str) -> AssembledModel {
        let settings = EstimationSettings::from_toml_str(toml).unwrap();
        let assembler = ModelDataAssembler::from_settings(&settings).unwrap();
        let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let rows: Vec<CaseObservation> = (0..40)
            .map(|i| CaseObservation::new(start + Duration::days(i), 50.0 + 3.0 * i as f64))
            .collect();
        let series = CaseCleaner::new(&settings.cleaning)
            .clean_and_pad(
                RegionId::from("init"),
                &rows,
                assembler.seeding_time(),
                assembler.horizon(),
            )
            .unwrap();
        assembler.assemble(&series).unwrap()
    }

    const FULL: &str = r#"
[rt]
random_walk_step = 7

[obs]
scale = { mean = 0.3, sd = 0.1 }

[[delays]]
mean = 1.6
mean_sd = 0.1
sd = 0.4
sd_sd = 0.05
max = 15

[[delays]]
mean = 0.8
mean_sd = 0.2
sd = 0.3
sd_sd = 0.05
max = 10
"#;

    #[test]
    fn test_all_components_present() {
        let model = assembled(FULL);
        let init = model.init.draw();
        let data = model.init.data();

        assert_eq!(init.delay_mean.len(), 2);
        assert_eq!(init.delay_sd.len(), 2);
        assert_eq!(init.eta.len(), data.gp.basis_functions);
        assert!(init.rho.is_some());
        assert!(init.alpha.is_some());
        assert!(init.rep_phi.is_some());
        assert!(init.initial_infections.is_some());
        assert!(init.initial_growth.is_some());
        assert!(init.initial_r.is_some());
        assert!(init.gt_mean.is_some());
        assert_eq!(init.bp_effects.len(), data.rt.bp_n);
        assert!(init.bp_sd.is_some());
        assert!(init.frac_obs.is_some());
    }

    #[test]
    fn test_draws_respect_constraints() {
        let model = assembled(FULL);
        let data = model.init.data();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let init = model.init.draw_with(&mut rng);
            let rho = init.rho.unwrap();
            assert!(rho > data.gp.ls_min && rho < data.gp.ls_max);
            assert!(init.alpha.unwrap() >= 0.0);
            assert!(init.rep_phi.unwrap() >= 0.0);
            assert!(init.bp_sd.unwrap() >= 0.0);
            assert!(init.frac_obs.unwrap() >= 0.0);
            assert!(init.initial_r.unwrap() > 0.0);
            assert!(init.delay_mean.iter().all(|v| *v >= 0.0));
            assert!(init.delay_sd.iter().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let model = assembled(FULL);
        let a = model.init.draw_with(&mut StdRng::seed_from_u64(3));
        let b = model.init.draw_with(&mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_successive_draws_differ() {
        let model = assembled(FULL);
        let mut rng = StdRng::seed_from_u64(5);
        let a = model.init.draw_with(&mut rng);
        let b = model.init.draw_with(&mut rng);
        assert_ne!(a.eta, b.eta);
    }

    #[test]
    fn test_disabled_components_absent() {
        let model = assembled("rt = false\ngp = false\n[obs]\nfamily = 'poisson'");
        let init = model.init.draw();
        assert!(init.eta.is_empty());
        assert!(init.rho.is_none());
        assert!(init.rep_phi.is_none());
        assert!(init.initial_r.is_none());
        assert!(init.bp_effects.is_empty());
        assert!(init.frac_obs.is_none());
        assert!(init.delay_mean.is_empty());
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let init = InitialValues {
            rho: Some(12.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&init).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
        assert_eq!(json["rho"], 12.0);
    }
}
