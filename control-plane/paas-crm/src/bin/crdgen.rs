use kube::core::CustomResourceExt;
use paas_crm::crd::{Paas, PaasConfig, PaasNS};

fn main() -> anyhow::Result<()> {
    for crd in [Paas::crd(), PaasNS::crd(), PaasConfig::crd()] {
        println!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
