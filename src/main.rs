fn main() -> anyhow::Result<()> {
    junction_areas_lib::run()
}
