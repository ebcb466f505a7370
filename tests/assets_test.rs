use flow_sprites::{
    data_structures::texture::decode_rgba,
    resources::load_binary,
    scene::{CONE_TEXTURE, ROBOT_TEXTURE, SUN_TEXTURE},
};

#[tokio::test]
async fn shipped_sprites_decode_to_rgba() {
    for name in [SUN_TEXTURE, ROBOT_TEXTURE, CONE_TEXTURE] {
        let bytes = load_binary(name)
            .await
            .unwrap_or_else(|e| panic!("{name}: {e:#}"));
        let rgba = decode_rgba(&bytes, Some("png")).unwrap();
        assert!(rgba.width() > 0 && rgba.height() > 0, "{name} is empty");
        // sprites are cut out: the corners are fully transparent
        assert_eq!(rgba.get_pixel(0, 0)[3], 0, "{name} has an opaque corner");
    }
}

#[tokio::test]
async fn missing_sprite_is_an_error_not_a_panic() {
    let result = load_binary("moon.png").await;
    let err = result.expect_err("moon.png should not exist");
    assert!(format!("{err:#}").contains("moon.png"));
}
