//! Resolve image activity
//!
//! Custom images referenced by resource ID are used as-is. Marketplace images
//! are looked up by URN; if the image carries a plan, its terms are accepted
//! for the subscription the first time it is used.

use azmachine_models::{ImageReference, ProvisioningSpec};

use crate::backend::AzureClients;
use crate::context::ProvisionContext;
use crate::error::{Error, Result};
use crate::metrics::observe;
use crate::resources::{ImageUrn, MarketplaceAgreement, Plan, ResourceKind, VirtualMachineImage, VmImageReference};

/// Image reference for the VM plus the image definition, when one was fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub reference: VmImageReference,
    pub image: Option<VirtualMachineImage>,
}

impl ResolvedImage {
    pub fn plan(&self) -> Option<&Plan> {
        self.image.as_ref().and_then(|image| image.plan.as_ref())
    }
}

pub async fn activity(
    ctx: &ProvisionContext,
    clients: &AzureClients,
    spec: &ProvisioningSpec,
) -> Result<ResolvedImage> {
    let urn = match &spec.image_reference {
        ImageReference::Id(id) => {
            ctx.trace_info(format!("Using image by ID: {}", id));
            return Ok(ResolvedImage {
                reference: VmImageReference::Id(id.clone()),
                image: None,
            });
        }
        ImageReference::Urn(urn) => ImageUrn::parse(urn).ok_or_else(|| Error::InvalidImageUrn(urn.clone()))?,
    };

    ctx.trace_info(format!("Resolving image {} in {}", urn, spec.location));
    let image = observe(
        ResourceKind::VirtualMachineImage,
        "get",
        clients.images.get(&spec.location, &urn).await,
    )
    .map_err(|e| Error::backend(ResourceKind::VirtualMachineImage, urn.to_string(), "get", e))?;

    if let Some(plan) = &image.plan {
        ensure_agreement_accepted(ctx, clients, plan).await?;
    }

    Ok(ResolvedImage {
        reference: VmImageReference::Marketplace(urn),
        image: Some(image),
    })
}

async fn ensure_agreement_accepted(ctx: &ProvisionContext, clients: &AzureClients, plan: &Plan) -> Result<()> {
    let plan_name = format!("{}:{}:{}", plan.publisher, plan.product, plan.name);

    let agreement = observe(
        ResourceKind::MarketplaceAgreement,
        "get",
        clients.marketplace.get(plan).await,
    )
    .map_err(|e| Error::backend(ResourceKind::MarketplaceAgreement, plan_name.clone(), "get", e))?;

    if agreement.accepted {
        ctx.trace_info(format!("Terms for plan {} already accepted", plan_name));
        return Ok(());
    }

    // Terms are accepted once per subscription
    ctx.trace_info(format!("Accepting terms for plan {}", plan_name));
    let accepted = MarketplaceAgreement {
        accepted: true,
        ..agreement
    };
    observe(
        ResourceKind::MarketplaceAgreement,
        "create",
        clients.marketplace.create(plan, &accepted).await,
    )
    .map_err(|e| Error::backend(ResourceKind::MarketplaceAgreement, plan_name, "create", e))?;

    Ok(())
}
