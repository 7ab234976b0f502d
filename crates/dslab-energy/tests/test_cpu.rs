use approx::assert_abs_diff_eq;

use dslab_energy::cpu::linear::LinearPowerModel;
use dslab_energy::cpu::utilization_aware::UtilizationAwarePowerModel;
use dslab_energy::power_model::PowerModel;

#[test]
fn test_linear_model() {
    let model = LinearPowerModel::new();
    assert_abs_diff_eq!(model.get_power(0., 80., 200.), 80.);
    assert_abs_diff_eq!(model.get_power(0.5, 80., 200.), 140.);
    assert_abs_diff_eq!(model.get_power(1., 80., 200.), 200.);
}

#[test]
fn test_utilization_aware_model() {
    let model = UtilizationAwarePowerModel::new();

    assert_eq!(model.get_power(0., 0.4, 1.), 0.4);

    assert!(model.get_power(1e-5, 0.4, 1.) < 0.4 + 1e-3);
    assert!(model.get_power(1e-5, 0.4, 1.) > 0.4);

    assert!(model.get_power(0.5, 0.4, 1.) > 0.77);
    assert!(model.get_power(0.5, 0.4, 1.) < 0.78);

    assert_abs_diff_eq!(model.get_power(1., 0.4, 1.), 1., epsilon = 1e-12);
}

#[test]
// Closures can be used as custom curves, they ignore the power bounds of the DVFS level.
fn test_closure_model() {
    let model: Box<dyn PowerModel> = Box::new(|u: f64| 50. + 100. * u * u);
    assert_abs_diff_eq!(model.get_power(0.5, 80., 200.), 75.);
    let cloned = model.clone();
    assert_abs_diff_eq!(cloned.get_power(1., 0., 0.), 150.);
}
