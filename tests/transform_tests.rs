//! Coordinate transform tests

#[cfg(test)]
mod tests {
    use skeleton_json::transform::{level_to_floor, mirror, transform_joint, CameraTilt};
    use skeleton_json::{FloorReference, Quaternion, TrackingConfig, Vec3, Vec4};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn camera_space(mirror: bool) -> TrackingConfig {
        TrackingConfig {
            mirror,
            gate_on_pose: false,
            world_space: false,
        }
    }

    // -----------------------------------------------------------------------
    // Mirroring
    // -----------------------------------------------------------------------

    #[test]
    fn mirror_flips_x_and_rotation_yz() {
        let (p, q) = mirror(
            Vec3::new(0.4, 1.2, 2.5),
            Quaternion::new(0.1, 0.2, 0.3, 0.9),
        );
        assert_eq!(p, Vec3::new(-0.4, 1.2, 2.5));
        assert_eq!(q, Quaternion::new(0.1, -0.2, -0.3, 0.9));
    }

    #[test]
    fn mirror_is_self_inverse() {
        let position = Vec3::new(-0.75, 0.3, 3.1);
        let orientation = Quaternion::new(0.5, -0.5, 0.25, 0.66);

        let (p, q) = mirror(position, orientation);
        let (p, q) = mirror(p, q);

        assert_eq!(p, position);
        assert_eq!(q, orientation);
    }

    #[test]
    fn mirror_flag_keeps_raw_sides() {
        let mut floor = FloorReference::new();
        floor.observe(Vec4::new(0.0, 1.0, 0.0, 1.0));

        let q = Quaternion::new(0.1, 0.2, 0.3, 0.9);
        let (_, kept) =
            transform_joint(Vec3::new(0.2, 0.0, 2.0), q, &mut floor, &camera_space(true));
        assert_eq!(kept, q);

        let mut floor = FloorReference::new();
        let (_, flipped) =
            transform_joint(Vec3::new(0.2, 0.0, 2.0), q, &mut floor, &camera_space(false));
        assert_eq!(flipped, Quaternion::new(0.1, -0.2, -0.3, 0.9));
    }

    // -----------------------------------------------------------------------
    // Root basis
    // -----------------------------------------------------------------------

    #[test]
    fn first_position_becomes_root_basis() {
        let mut floor = FloorReference::new();
        assert_eq!(floor.root_basis(), None);

        let root = floor.apply_root_basis(Vec3::new(0.5, 1.0, 2.5));
        assert_eq!(root, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(floor.root_basis(), Some((0.5, 2.5)));
    }

    #[test]
    fn root_basis_never_moves() {
        let mut floor = FloorReference::new();
        floor.apply_root_basis(Vec3::new(0.5, 1.0, 2.5));

        for (x, y, z) in [(1.0, 0.2, 3.0), (-2.0, 0.0, 0.5), (0.5, 9.0, 2.5)] {
            let p = floor.apply_root_basis(Vec3::new(x, y, z));
            assert!(approx(p.x, x - 0.5));
            assert_eq!(p.y, y);
            assert!(approx(p.z, z - 2.5));
        }
        assert_eq!(floor.root_basis(), Some((0.5, 2.5)));
    }

    #[test]
    fn root_basis_is_captured_after_mirroring() {
        let mut floor = FloorReference::new();
        let identity = Quaternion::identity();

        let (root, _) = transform_joint(
            Vec3::new(0.3, -0.1, 2.0),
            identity,
            &mut floor,
            &camera_space(false),
        );
        assert_eq!(root.x, 0.0);
        assert_eq!(floor.root_basis(), Some((-0.3, 2.0)));

        let (hand, _) = transform_joint(
            Vec3::new(0.5, 0.2, 2.0),
            identity,
            &mut floor,
            &camera_space(false),
        );
        assert!(approx(hand.x, -0.2));
    }

    // -----------------------------------------------------------------------
    // Floor reference
    // -----------------------------------------------------------------------

    #[test]
    fn camera_height_waits_for_nonzero_w() {
        let mut floor = FloorReference::new();

        floor.observe(Vec4::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(floor.camera_height(), None);

        floor.observe(Vec4::new(0.0, 0.9, 0.3, 1.1));
        assert_eq!(floor.camera_height(), Some(1.1));

        floor.observe(Vec4::new(0.0, 0.9, 0.3, 1.4));
        assert_eq!(floor.camera_height(), Some(1.1));
        assert_eq!(floor.clip_plane().w, 1.4);
    }

    #[test]
    fn tilt_follows_clip_plane() {
        let level = CameraTilt::from_clip_plane(Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert!(approx(level.angle, 0.0));
        assert!(approx(level.cos, 1.0));

        let pitched = CameraTilt::from_clip_plane(Vec4::new(0.0, 0.9, 0.3, 1.0));
        assert!(approx(pitched.angle, (0.3f32).atan2(0.9)));
        assert!(approx(pitched.sin, 0.316_228));
    }

    // -----------------------------------------------------------------------
    // World space
    // -----------------------------------------------------------------------

    #[test]
    fn level_floor_only_lifts_by_camera_height() {
        let plane = Vec4::new(0.0, 1.0, 0.0, 1.2);
        let p = level_to_floor(
            Vec3::new(0.1, 0.6, 2.5),
            plane,
            CameraTilt::from_clip_plane(plane),
        );
        assert!(approx(p.x, 0.1));
        assert!(approx(p.y, 1.8));
        assert!(approx(p.z, 2.5));
    }

    #[test]
    fn pitched_camera_applies_depth_correction() {
        let plane = Vec4::new(0.0, 0.9, 0.3, 1.0);
        let tilt = CameraTilt::from_clip_plane(plane);
        let p = level_to_floor(Vec3::new(0.0, 0.0, 2.0), plane, tilt);

        // rotated_y = 2 sin, rotated_z = 2 cos
        assert!(approx(p.y, 1.0 + 2.0 * tilt.sin));
        assert!(approx(p.z, 2.0 + (2.0 - 2.0 * tilt.cos)));
        assert!(approx(p.y, 1.632_456));
        assert!(approx(p.z, 2.102_633));
    }

    #[test]
    fn world_space_leveling_is_opt_in() {
        let config = TrackingConfig {
            mirror: true,
            gate_on_pose: false,
            world_space: true,
        };
        let mut floor = FloorReference::new();
        floor.observe(Vec4::new(0.0, 1.0, 0.0, 1.2));

        let (p, _) = transform_joint(
            Vec3::new(0.0, -0.1, 2.5),
            Quaternion::identity(),
            &mut floor,
            &config,
        );
        assert!(approx(p.y, 1.1));
        assert_eq!(floor.root_basis(), Some((0.0, 2.5)));

        let mut floor = FloorReference::new();
        floor.observe(Vec4::new(0.0, 1.0, 0.0, 1.2));
        let (p, _) = transform_joint(
            Vec3::new(0.0, -0.1, 2.5),
            Quaternion::identity(),
            &mut floor,
            &camera_space(true),
        );
        assert!(approx(p.y, -0.1));
    }
}
