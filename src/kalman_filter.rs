use nalgebra::SMatrix;
use tracing::warn;

/* -----------------------------------------------------------------------------
 * Type aliases
 * ----------------------------------------------------------------------------- */
// 1x4, [cx, cy, a, h]
pub(crate) type DetectBox = SMatrix<f32, 1, 4>;
// 1x8
pub(crate) type StateMean = SMatrix<f32, 1, 8>;
// 8x8
pub(crate) type StateCov = SMatrix<f32, 8, 8>;
// 1x4
pub(crate) type StateHMean = SMatrix<f32, 1, 4>;
// 4x4
pub(crate) type StateHCov = SMatrix<f32, 4, 4>;

pub(crate) const STD_WEIGHT_POSITION: f32 = 1. / 20.;
pub(crate) const STD_WEIGHT_VELOCITY: f32 = 1. / 160.;

/* -----------------------------------------------------------------------------
 * Kalman Filter
 * ----------------------------------------------------------------------------- */

/// Constant-velocity filter over `[cx, cy, a, h, vcx, vcy, va, vh]`.
///
/// Process and measurement noise are scaled by the current box height so
/// near and far objects get comparable relative uncertainty. The filter
/// itself is stateless; every track carries its own mean and covariance.
#[derive(Debug, Clone)]
pub(crate) struct KalmanFilter {
    std_weight_position: f32,
    std_weight_velocity: f32,
    motion_mat: SMatrix<f32, 8, 8>, // 8x8
    update_mat: SMatrix<f32, 4, 8>, // 4x8
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(STD_WEIGHT_POSITION, STD_WEIGHT_VELOCITY)
    }
}

impl KalmanFilter {
    pub(crate) fn new(
        std_weight_position: f32,
        std_weight_velocity: f32,
    ) -> Self {
        let ndim = 4;
        let dt = 1.0;

        let mut motion_mat = SMatrix::<f32, 8, 8>::identity();
        for i in 0..ndim {
            motion_mat[(i, i + ndim)] = dt;
        }

        let mut update_mat = SMatrix::<f32, 4, 8>::zeros();
        for i in 0..ndim {
            update_mat[(i, i)] = 1.0;
        }

        Self {
            std_weight_position,
            std_weight_velocity,
            motion_mat,
            update_mat,
        }
    }

    pub(crate) fn initiate(
        &self,
        mean: &mut StateMean,
        covariance: &mut StateCov,
        measurement: &DetectBox,
    ) {
        mean.fixed_view_mut::<1, 4>(0, 0).copy_from(measurement);
        mean.fixed_view_mut::<1, 4>(0, 4).fill(0.0);

        let h = measurement[(0, 3)];
        let pos = 2.0 * self.std_weight_position * h;
        let vel = 10.0 * self.std_weight_velocity * h;
        let std = StateMean::from_row_slice(&[
            pos, pos, 1e-2, pos, vel, vel, 1e-5, vel,
        ]);

        *covariance =
            StateCov::from_diagonal(&std.component_mul(&std).transpose());
    }

    pub(crate) fn predict(&self, mean: &mut StateMean, covariance: &mut StateCov) {
        let h = mean[(0, 3)];
        let pos = self.std_weight_position * h;
        let vel = self.std_weight_velocity * h;
        let std = StateMean::from_row_slice(&[
            pos, pos, 1e-2, pos, vel, vel, 1e-5, vel,
        ]);
        let motion_cov =
            StateCov::from_diagonal(&std.component_mul(&std).transpose());

        *mean = (self.motion_mat * mean.transpose()).transpose();
        *covariance = self.motion_mat * *covariance * self.motion_mat.transpose()
            + motion_cov;
    }

    /// Projects the state into measurement space, adding observation noise.
    pub(crate) fn project(
        &self,
        mean: &StateMean,      // 1x8
        covariance: &StateCov, // 8x8
    ) -> (StateHMean, StateHCov) {
        let h = mean[(0, 3)];
        let pos = self.std_weight_position * h;
        let std = StateHMean::from_row_slice(&[pos, pos, 1e-1, pos]);
        let innovation_cov =
            StateHCov::from_diagonal(&std.component_mul(&std).transpose());

        let projected_mean = mean * self.update_mat.transpose();
        let projected_cov =
            self.update_mat * covariance * self.update_mat.transpose()
                + innovation_cov;
        (projected_mean, projected_cov)
    }

    pub(crate) fn update(
        &self,
        mean: &mut StateMean,      // 1x8
        covariance: &mut StateCov, // 8x8
        measurement: &DetectBox,   // 1x4
    ) {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let Some(cholesky) = projected_cov.cholesky() else {
            warn!(
                ?projected_cov,
                "projected covariance is not positive definite, skipping measurement"
            );
            return;
        };

        // (P H^T)^T, 4x8
        let b = (*covariance * self.update_mat.transpose()).transpose();
        // K^T, 4x8
        let kalman_gain = cholesky.solve(&b);
        let innovation = measurement - projected_mean;

        *mean += innovation * kalman_gain;
        *covariance -= kalman_gain.transpose() * projected_cov * kalman_gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearly_eq::assert_nearly_eq;

    fn assert_cov_nearly_eq<const R: usize>(
        actual: &SMatrix<f32, R, R>,
        expected: &SMatrix<f32, R, R>,
    ) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_nearly_eq!(*a, *e, 1e-4);
        }
    }

    #[rustfmt::skip]
    fn predicted_covariance() -> StateCov {
        StateCov::from_row_slice(&[
            4.24, 0.0,  0.0,     0.0,  4.0,      0.0,      0.0,    0.0,
            0.0,  4.24, 0.0,     0.0,  0.0,      4.0,      0.0,    0.0,
            0.0,  0.0,  1.01e-2, 0.0,  0.0,      0.0,      1.0e-6, 0.0,
            0.0,  0.0,  0.0,     4.24, 0.0,      0.0,      0.0,    4.0,
            4.0,  0.0,  0.0,     0.0,  4.000625, 0.0,      0.0,    0.0,
            0.0,  4.0,  0.0,     0.0,  0.0,      4.000625, 0.0,    0.0,
            0.0,  0.0,  1.0e-6,  0.0,  0.0,      0.0,      1.0e-6, 0.0,
            0.0,  0.0,  0.0,     4.0,  0.0,      0.0,      0.0,    4.000625,
        ])
    }

    #[test]
    fn test_initiate() {
        let kalman_filter = KalmanFilter::default();
        let mut mean = StateMean::zeros();
        let mut covariance = StateCov::zeros();
        let measurement = DetectBox::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);

        kalman_filter.initiate(&mut mean, &mut covariance, &measurement);

        assert_eq!(
            mean,
            StateMean::from_row_slice(&[1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0])
        );
        let expected = StateCov::from_diagonal(
            &StateMean::from_row_slice(&[
                0.16, 0.16, 1.0e-4, 0.16, 6.25e-2, 6.25e-2, 1e-10, 6.25e-2,
            ])
            .transpose(),
        );
        assert_cov_nearly_eq(&covariance, &expected);
    }

    #[test]
    fn test_predict() {
        let kalman_filter = KalmanFilter::default();
        let mut mean = StateMean::from_row_slice(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0,
        ]);
        let mut covariance = StateCov::from_diagonal(
            &StateMean::from_row_slice(&[
                0.2, 0.2, 0.01, 0.2, 4.0, 4.0, 0.000001, 4.0,
            ])
            .transpose(),
        );

        kalman_filter.predict(&mut mean, &mut covariance);

        assert_eq!(
            mean,
            StateMean::from_row_slice(&[6.0, 8.0, 10.0, 12.0, 5.0, 6.0, 7.0, 8.0])
        );
        assert_cov_nearly_eq(&covariance, &predicted_covariance());
    }

    #[test]
    fn test_project() {
        let kalman_filter = KalmanFilter::default();
        let mean = StateMean::from_row_slice(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0,
        ]);

        let (projected_mean, projected_cov) =
            kalman_filter.project(&mean, &predicted_covariance());

        assert_eq!(
            projected_mean,
            StateHMean::from_row_slice(&[1., 2., 3., 4.])
        );
        let expected = StateHCov::from_diagonal(
            &StateHMean::from_row_slice(&[4.28, 4.28, 0.0201, 4.28]).transpose(),
        );
        assert_cov_nearly_eq(&projected_cov, &expected);
    }

    #[test]
    fn test_update() {
        let kalman_filter = KalmanFilter::default();
        let mut mean = StateMean::from_row_slice(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0,
        ]);
        let mut covariance = predicted_covariance();
        let measurement = DetectBox::from_row_slice(&[1.0, 2.0, 3.0, 4.0]);

        kalman_filter.update(&mut mean, &mut covariance, &measurement);

        // the measurement equals the projected mean, so the mean is unchanged
        assert_eq!(
            mean,
            StateMean::from_row_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
        );
        #[rustfmt::skip]
        let expected = StateCov::from_row_slice(&[
            3.96261682e-02, 0.0, 0.0, 0.0, 3.73831776e-02, 0.0, 0.0, 0.0,
            0.0, 3.96261682e-02, 0.0, 0.0, 0.0, 3.73831776e-02, 0.0, 0.0,
            0.0, 0.0, 5.02487562e-03, 0.0, 0.0, 0.0, 4.97512438e-07, 0.0,
            0.0, 0.0, 0.0, 3.96261682e-02, 0.0, 0.0, 0.0, 3.73831776e-02,
            3.73831776e-02, 0.0, 0.0, 0.0, 2.62307243e-01, 0.0, 0.0, 0.0,
            0.0, 3.73831776e-02, 0.0, 0.0, 0.0, 2.62307243e-01, 0.0, 0.0,
            0.0, 0.0, 4.97512438e-07, 0.0, 0.0, 0.0, 9.99950249e-07, 0.0,
            0.0, 0.0, 0.0, 3.73831776e-02, 0.0, 0.0, 0.0, 2.62307243e-01,
        ]);
        assert_cov_nearly_eq(&covariance, &expected);
    }

    #[test]
    fn test_velocity_converges_on_constant_motion() {
        let kalman_filter = KalmanFilter::default();
        let mut mean = StateMean::zeros();
        let mut covariance = StateCov::zeros();
        kalman_filter.initiate(
            &mut mean,
            &mut covariance,
            &DetectBox::from_row_slice(&[100.0, 50.0, 0.5, 100.0]),
        );

        for step in 1..=40 {
            kalman_filter.predict(&mut mean, &mut covariance);
            let cx = 100.0 + 2.0 * step as f32;
            kalman_filter.update(
                &mut mean,
                &mut covariance,
                &DetectBox::from_row_slice(&[cx, 50.0, 0.5, 100.0]),
            );
        }

        assert_nearly_eq!(mean[(0, 0)], 180.0, 0.5);
        assert_nearly_eq!(mean[(0, 4)], 2.0, 0.25);
        assert_nearly_eq!(mean[(0, 5)], 0.0, 0.25);
        assert_nearly_eq!(mean[(0, 3)], 100.0, 0.5);
    }
}
