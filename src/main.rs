use flow_sprites::{animation::AnimationConfig, flow, scene::AnimationScene};

fn main() -> anyhow::Result<()> {
    let scene = AnimationScene::constructor::<()>(AnimationConfig::default());
    flow::run(vec![scene])
}
