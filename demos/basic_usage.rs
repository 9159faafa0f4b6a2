use linchpin::survival::{logrank, median_survival_time};
use linchpin::{estimate_survival_curve, CoxModel, SurvivalData};
use ndarray::Array2;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("survival estimator - basic usage");
    println!("================================\n");

    // two arms, months to death / last follow-up
    let treated_times = vec![6.0, 9.5, 12.0, 14.2, 18.0, 21.3, 25.0, 30.1, 33.0, 40.0];
    let treated_events = vec![true, false, true, true, false, true, false, true, false, false];
    let control_times = vec![2.1, 3.5, 4.0, 5.8, 7.2, 8.0, 10.4, 12.9, 15.5, 19.0];
    let control_events = vec![true, true, true, false, true, true, true, false, true, true];

    for (name, times, events) in [
        ("treated", &treated_times, &treated_events),
        ("control", &control_times, &control_events),
    ] {
        let curve = estimate_survival_curve(times, events);
        println!("{} arm:", name);
        for point in &curve {
            println!("  t = {:>5.1}  S(t) = {:.3}", point.time, point.probability);
        }
        match median_survival_time(&curve) {
            Some(m) => println!("  median survival: {:.1}\n", m),
            None => println!("  median survival: not reached\n"),
        }
    }

    let test = logrank(&treated_times, &treated_events, &control_times, &control_events);
    println!("log-rank: chi2 = {:.3}, p = {:.4}", test.statistic, test.p_value);
    if let Some(hr) = test.hazard_ratio() {
        println!("hazard ratio (treated vs control): {:.3}\n", hr);
    }

    // same data as a single-covariate cox model: treated = 1
    let times: Vec<f64> = treated_times.iter().chain(&control_times).copied().collect();
    let events: Vec<bool> = treated_events.iter().chain(&control_events).copied().collect();
    let arm: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 0.0 }).collect();
    let data = SurvivalData::new(times, events, Array2::from_shape_vec((20, 1), arm)?)?;

    let mut model = CoxModel::new().with_feature_names(vec!["treated".to_string()]);
    model.fit(&data)?;
    model.summary()?.print();

    Ok(())
}
