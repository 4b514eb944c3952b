use std::time::Duration;
use monocle::cfg::{set_config, SchedulerCfg};
use monocle::{
    block_on, json, launch, o0, oroutine, run_until_idle, run_with, set_unobserved_hook, sleep, spawn_blocking, Co,
    Context, Error, Result, Value,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[oroutine]
async fn square(co: Co, x: f64) -> Result<f64> {
    co.wait(sleep(Duration::from_millis(200))).await?;
    Ok(x * x)
}

#[oroutine]
async fn cube(co: Co, x: f64) -> Result<f64> {
    let squared = co.wait(square(x)).await?;
    let squared = squared
        .as_f64()
        .ok_or_else(|| Error::Conversion(format!("square returned {squared}")))?;
    Ok(x * squared)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    set_config(SchedulerCfg::from_env()?);
    set_unobserved_hook(|err| error!(error = %err, "background coroutine failed"));

    let cubed = block_on(cube(3.0))?;
    info!(%cubed, "cube(3)");

    let checksum = block_on(monocle::run(|co| async move {
        let sum = spawn_blocking(|| Ok(Value::from((1..=1_000_000u64).sum::<u64>())));
        co.wait(sum).await
    }))?;
    info!(%checksum, "summed on the blocking pool");

    let greeter = Context::from_value(json!({ "name": "monocle" }))?;
    greeter.define("greet", o0(|co, args| async move {
        let greeting: String = args.arg(0)?;
        let name: String = co.this().field("name")?;
        co.yield_now().await?;
        Ok(Value::from(format!("{greeting}, {name}!")))
    }));
    let greeting = block_on(run_with(greeter, |co| async move { co.wait(co.invoke("greet", ["hello"])).await }))?;
    info!(%greeting, "greeted");

    let failing = o0(|_co, _args| async move { Err(Error::raise("foo bar baz")) });
    launch(&failing, ());
    run_until_idle();

    Ok(())
}
