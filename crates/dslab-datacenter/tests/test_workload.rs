use approx::assert_abs_diff_eq;
use rand::prelude::*;
use rand_pcg::Pcg64;
use rstest::rstest;

use dslab_datacenter::core::config::sim_config::{SimulationConfig, WorkloadConfig};
use dslab_datacenter::error::DatacenterError;
use dslab_datacenter::extensions::arrival_rates::ArrivalRateCurve;
use dslab_datacenter::extensions::lifetime_distribution::{minutes_to_steps, LifetimeDistribution};
use dslab_datacenter::extensions::trace_reader::{
    parse_trace, InMemoryTraces, PlanetLabTraceReader, UtilizationTraceSource,
};
use dslab_datacenter::extensions::vm_profile_generator::{
    load_profiles, save_profiles, validate_profiles, VmProfile, WorkloadGenerator, LONG_LIVED_LIFETIME,
};

fn lifetimes() -> LifetimeDistribution {
    LifetimeDistribution::from_csv("test-data/lifetime.csv").unwrap()
}

fn arrival_rates() -> ArrivalRateCurve {
    ArrivalRateCurve::from_csv("test-data/arrival_rates.csv").unwrap()
}

#[test]
// Duplicate lifetimes are merged, CDF grows from 0 to 1.
fn test_lifetime_cdf() {
    let dist = lifetimes();
    let lifetimes = dist.lifetimes();
    assert_eq!(lifetimes.len(), 6);
    assert_abs_diff_eq!(lifetimes[1], 5., epsilon = 1e-9);

    let cdf = dist.cdf_values();
    assert_eq!(cdf[0], 0.);
    assert_abs_diff_eq!(cdf[cdf.len() - 1], 1., epsilon = 1e-12);
    for pair in cdf.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    assert_eq!(dist.cdf(-1.), 0.);
    assert_eq!(dist.cdf(10.), 1.);
}

#[rstest]
#[case(10.)]
#[case(100.)]
#[case(1000.)]
fn test_lifetime_inverse_cdf(#[case] minutes: f64) {
    let dist = lifetimes();
    let log_x = minutes.log10();
    assert_abs_diff_eq!(dist.inverse_cdf(dist.cdf(log_x)), log_x, epsilon = 1e-9);
}

#[test]
fn test_lifetime_sampling() {
    let dist = lifetimes();
    let mut rand = Pcg64::seed_from_u64(7);
    for _ in 0..200 {
        let minutes = dist.sample_minutes(&mut rand);
        assert!((1. - 1e-9..=1440. + 1e-9).contains(&minutes));
        let steps = dist.sample_steps(&mut rand, 300., 12).unwrap();
        assert!((1..=12).contains(&steps));
    }
    assert_eq!(minutes_to_steps(0.5, 300.), 1);
    assert_eq!(minutes_to_steps(5., 300.), 1);
    assert_eq!(minutes_to_steps(5.1, 300.), 2);
}

#[test]
fn test_invalid_lifetime_distribution() {
    assert!(matches!(
        LifetimeDistribution::from_points(&[(5., 10.)]),
        Err(DatacenterError::InvalidDistribution(_))
    ));
    assert!(matches!(
        LifetimeDistribution::from_points(&[(5., 10.), (5., 20.)]),
        Err(DatacenterError::InvalidDistribution(_))
    ));
    assert!(matches!(
        LifetimeDistribution::from_points(&[(0., 10.), (5., 20.)]),
        Err(DatacenterError::InvalidDistribution(_))
    ));
    assert!(matches!(
        LifetimeDistribution::from_points(&[(1., 0.), (5., 0.)]),
        Err(DatacenterError::InvalidDistribution(_))
    ));
}

#[rstest]
#[case(0., 0.2)]
#[case(3., 0.35)]
#[case(12., 1.)]
#[case(21., 0.4)]
#[case(36., 1.)]
#[case(-3., 0.4)]
fn test_arrival_rate_at(#[case] hour: f64, #[case] rate: f64) {
    assert_abs_diff_eq!(arrival_rates().rate_at(hour), rate, epsilon = 1e-12);
}

#[test]
fn test_arrivals_per_step() {
    let curve = arrival_rates();
    assert_eq!(curve.arrivals_per_step(4, 21600., 10.), vec![2, 5, 10, 6]);
    assert_eq!(curve.arrivals_per_step(3, 300., 0.), vec![0, 0, 0]);

    let flat = ArrivalRateCurve::from_points(&[(5., 0.5)]).unwrap();
    assert_eq!(flat.arrivals_per_step(2, 300., 4.), vec![2, 2]);
    assert!(ArrivalRateCurve::from_points(&[]).is_err());
}

#[test]
fn test_planetlab_trace_reader() {
    let mut reader = PlanetLabTraceReader::new("test-data/traces", 42);
    let traces = reader.load_traces(3, 16).unwrap();
    assert_eq!(traces.len(), 3);
    for trace in &traces {
        assert_eq!(trace.len(), 16);
        assert!(trace.iter().all(|v| (0. ..=1.).contains(v)));
    }

    assert!(matches!(
        reader.load_traces(6, 4),
        Err(DatacenterError::NotEnoughTraces {
            required: 6,
            available: 5
        })
    ));
    assert!(matches!(
        reader.load_traces(2, 20),
        Err(DatacenterError::TraceTooShort {
            length: 16,
            required: 20,
            ..
        })
    ));
    assert!(matches!(
        PlanetLabTraceReader::new("test-data/missing", 42).load_traces(1, 4),
        Err(DatacenterError::Io(_))
    ));
}

#[test]
// Selection of trace files depends only on the seed.
fn test_trace_reader_determinism() {
    let first = PlanetLabTraceReader::new("test-data/traces", 1).load_traces(2, 8).unwrap();
    let second = PlanetLabTraceReader::new("test-data/traces", 1).load_traces(2, 8).unwrap();
    assert_eq!(first, second);
}

#[test]
// Only plain integer lines are used, values are clamped to 0-1.
fn test_parse_trace() {
    let content = std::fs::read_to_string("test-data/short-traces/trace_mixed").unwrap();
    assert_eq!(parse_trace(&content, 4, "trace_mixed").unwrap(), vec![0.05, 0.07, 1., 0.09]);
    assert!(matches!(
        parse_trace(&content, 5, "trace_mixed"),
        Err(DatacenterError::TraceTooShort {
            length: 4,
            required: 5,
            ..
        })
    ));

    let content = std::fs::read_to_string("test-data/short-traces/trace_short").unwrap();
    assert_eq!(parse_trace(&content, 3, "trace_short").unwrap(), vec![0.1, 0.2, 0.3]);
}

#[test]
fn test_in_memory_traces() {
    let mut traces = InMemoryTraces::new(vec![vec![0.1, 0.2, 0.3], vec![1.5, 0.5, 0.5]]);
    let loaded = traces.load_traces(3, 2).unwrap();
    assert_eq!(loaded, vec![vec![0.1, 0.2], vec![1., 0.5], vec![0.1, 0.2]]);
    assert!(traces.load_traces(1, 4).is_err());
    assert!(InMemoryTraces::new(Vec::new()).load_traces(1, 1).is_err());
}

#[test]
fn test_generator_from_config() {
    let config = SimulationConfig::from_file("test-configs/config.yaml").unwrap();
    let mut generator = WorkloadGenerator::from_config(&config).unwrap();
    let profiles = generator.generate(3).unwrap();

    // 3 initial VMs and one dynamic VM per step
    assert_eq!(profiles.len(), 15);
    assert_eq!(profiles.iter().filter(|p| p.arrival_time == 0).count(), 4);
    assert_eq!(
        profiles.iter().filter(|p| p.lifetime == LONG_LIVED_LIFETIME).count(),
        1
    );
    for pair in profiles.windows(2) {
        assert!(pair[0].arrival_time <= pair[1].arrival_time);
    }
    for profile in &profiles {
        assert_eq!(profile.cpu_utilization.len(), 12);
        assert!(profile.lifetime >= 1);
        if profile.lifetime != LONG_LIVED_LIFETIME {
            assert!(profile.lifetime <= 12);
        }
    }
    let mut ids: Vec<u32> = profiles.iter().map(|p| p.vm_id).collect();
    ids.sort();
    assert_eq!(ids, (0..15).collect::<Vec<u32>>());
}

#[test]
fn test_generator_without_arrivals() {
    let workload = WorkloadConfig {
        trace_dir: String::new(),
        lifetime_distribution: String::new(),
        arrival_rates: String::new(),
        num_initial_vms: 4,
        num_peak_arrive: 0.,
        long_lived_ratio: 1.,
        traces_per_host: 4,
    };
    let traces = InMemoryTraces::new(vec![vec![0.5; 6], vec![0.25; 6]]);
    let mut generator =
        WorkloadGenerator::new(lifetimes(), arrival_rates(), Box::new(traces), &workload, 6, 300., 42);
    let profiles = generator.generate(10).unwrap();

    assert_eq!(profiles.len(), 4);
    assert!(profiles.iter().all(|p| p.arrival_time == 0 && p.lifetime == LONG_LIVED_LIFETIME));
    assert_eq!(profiles[1].cpu_utilization, vec![0.25; 6]);
}

#[test]
fn test_profiles_file() {
    let profiles = vec![
        VmProfile {
            vm_id: 0,
            arrival_time: 0,
            lifetime: 3,
            cpu_utilization: vec![0.1, 0.2, 0.3],
        },
        VmProfile {
            vm_id: 1,
            arrival_time: 2,
            lifetime: LONG_LIVED_LIFETIME,
            cpu_utilization: vec![0.5; 3],
        },
    ];
    assert!(validate_profiles(&profiles, 3).is_ok());
    assert!(matches!(
        validate_profiles(&profiles, 4),
        Err(DatacenterError::MissingUtilization {
            vm_id: 0,
            length: 3,
            required: 4
        })
    ));

    let path = std::env::temp_dir().join("dslab-datacenter-test-profiles.json");
    let path = path.to_string_lossy().to_string();
    save_profiles(&profiles, &path).unwrap();
    let loaded = load_profiles(&path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].lifetime, LONG_LIVED_LIFETIME);
    assert_eq!(loaded[0].cpu_utilization, vec![0.1, 0.2, 0.3]);
}
