use super::*;

#[test]
fn defaults_inherit_everything_from_output() {
    let s = ResourceSettings::default();
    assert_eq!(s.width_mode, SizeMode::Default);
    assert_eq!(s.dimension, OutputDimension::SameAsOutput);
    assert_eq!(s.output_channels, OutputChannel::SameAsOutput);
    assert_eq!(s.output_precision, OutputPrecision::SameAsOutput);
    assert!(!s.double_buffered);
    assert_eq!(s.edit_flags, EditFlags::ALL);
}

#[test]
fn apply_reports_whether_value_changed() {
    let mut s = ResourceSettings::default();
    assert!(s.apply(SettingsEdit::Width(256)).unwrap());
    assert!(!s.apply(SettingsEdit::Width(256)).unwrap());
    assert_eq!(s.width, 256);
}

#[test]
fn apply_rejects_fields_outside_edit_mask() {
    let mut s = ResourceSettings {
        edit_flags: EditFlags::DIMENSION | EditFlags::SIZE,
        ..ResourceSettings::default()
    };
    let err = s
        .apply(SettingsEdit::Channels(OutputChannel::R))
        .unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
    assert_eq!(s.output_channels, OutputChannel::SameAsOutput);

    assert!(s.apply(SettingsEdit::HeightMode(SizeMode::Fixed)).unwrap());
    assert!(s.apply(SettingsEdit::Wrap(WrapMode::Clamp)).unwrap());
}

#[test]
fn apply_rejects_negative_percentages() {
    let mut s = ResourceSettings::default();
    assert!(s.apply(SettingsEdit::WidthPercent(-1.0)).is_err());
    assert!(s.apply(SettingsEdit::DepthPercent(f32::NAN)).is_err());
    assert!(s.apply(SettingsEdit::HeightPercent(0.0)).unwrap());
}

#[test]
fn pot_preset_sets_fixed_width_and_height() {
    let mut s = ResourceSettings::default();
    assert!(s.apply(SettingsEdit::PotSize(PotSize::P128)).unwrap());
    assert_eq!((s.width, s.height), (128, 128));

    s.apply(SettingsEdit::PotSize(PotSize::Custom)).unwrap();
    assert_eq!((s.width, s.height), (128, 128));
}

#[test]
fn edit_flag_groups_cover_members() {
    assert!(EditFlags::SIZE.contains(EditFlags::DEPTH_MODE));
    assert!(!EditFlags::SIZE.contains(EditFlags::DIMENSION));
    assert!(EditFlags::FORMAT.contains(EditFlags::TARGET_FORMAT));
    assert!(EditFlags::ALL.contains(EditFlags::SIZE | EditFlags::FORMAT));
    assert!(EditFlags::NONE.contains(EditFlags::NONE));
}

#[test]
fn settings_deserialize_with_partial_fields() {
    let s: ResourceSettings = serde_json::from_str(
        r#"{"width_mode":"percentage_of_output","width_percent":50,"dimension":"texture_3d"}"#,
    )
    .unwrap();
    assert_eq!(s.width_mode, SizeMode::PercentageOfOutput);
    assert_eq!(s.width_percent, 50.0);
    assert_eq!(s.dimension, OutputDimension::Texture3D);
    assert_eq!(s.height, 512);
}

#[test]
fn settings_edit_uses_field_value_tagging() {
    let e: SettingsEdit = serde_json::from_str(r#"{"field":"width","value":64}"#).unwrap();
    assert_eq!(e, SettingsEdit::Width(64));
}

#[test]
fn output_shape_depth_defaults_to_one() {
    let o: OutputShape = serde_json::from_str(
        r#"{"width":8,"height":4,"format":"rgba8_unorm","dimension":"texture_2d"}"#,
    )
    .unwrap();
    assert_eq!(o, OutputShape::texture_2d(8, 4, TextureFormat::Rgba8Unorm));
    assert_eq!(o.extent(), Extent3::new(8, 4, 1));
}
