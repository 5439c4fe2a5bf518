use std::{
    pin::Pin,
    sync::Arc,
    time::{Instant, SystemTime},
};

use futures::{Stream, StreamExt};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

/// Terminal stage. Consumes the whole stream and produces what was built
/// from it.
#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    type Output: Send;

    async fn run<S>(&self, input: S) -> Result<Self::Output, PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

/// Source, then same-type transforms in order, then the sink.
pub struct Pipeline<S, T, K> {
    source: S,
    transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>,
    sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            transforms: Vec::new(),
            sink,
        }
    }

    pub fn with_transform<X>(mut self, transform: X) -> Self
    where
        X: Transform<T, T> + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(transform));
        self
    }

    pub async fn run(self) -> Result<K::Output, PipelineError> {
        let started = Instant::now();
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t = t.clone();
                async move { t.apply(item?).await }
            }));
        }

        let out = self.sink.run(stream).await;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = out.is_ok(),
            "pipeline finished"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Numbers(Vec<i64>);

    #[async_trait::async_trait]
    impl Source<i64> for Numbers {
        async fn stream(
            &self,
        ) -> Pin<Box<dyn Stream<Item = Result<Envelope<i64>, PipelineError>> + Send>> {
            let items: Vec<_> = self.0.iter().map(|n| Ok(Envelope::new(*n))).collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    struct RejectNegative;

    #[async_trait::async_trait]
    impl Transform<i64, i64> for RejectNegative {
        async fn apply(&self, input: Envelope<i64>) -> Result<Envelope<i64>, PipelineError> {
            if input.payload < 0 {
                return Err(PipelineError::Transform("negative".to_string()));
            }
            Ok(input)
        }
    }

    struct Collect;

    #[async_trait::async_trait]
    impl Sink<i64> for Collect {
        type Output = Vec<i64>;

        async fn run<S>(&self, mut input: S) -> Result<Vec<i64>, PipelineError>
        where
            S: Stream<Item = Result<Envelope<i64>, PipelineError>> + Send + Unpin + 'static,
        {
            let mut out = Vec::new();
            while let Some(item) = input.next().await {
                out.push(item?.payload);
            }
            Ok(out)
        }
    }

    #[tokio::test]
    async fn runs_source_through_transforms_into_sink() {
        let out = Pipeline::new(Numbers(vec![1, 2, 3]), Collect)
            .with_transform(RejectNegative)
            .run()
            .await
            .unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn transform_errors_reach_the_sink() {
        let res = Pipeline::new(Numbers(vec![1, -2, 3]), Collect)
            .with_transform(RejectNegative)
            .run()
            .await;
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }
}
