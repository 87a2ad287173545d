fn main() {
    let _shadow = shadow_rs::ShadowBuilder::builder().build().expect("shadow_rs should collect build metadata");
}
