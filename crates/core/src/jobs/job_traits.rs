use async_trait::async_trait;

use super::job_model::{JobContext, Schedule};
use crate::errors::Result;

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    fn schedule(&self) -> Schedule;
    async fn run(&self, ctx: &JobContext) -> Result<()>;
}
