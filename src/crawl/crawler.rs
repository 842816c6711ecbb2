// Copyright 2024. Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::config::ConfigError;
use crate::crawl::{CrawlContext, CrawlError, CrawlReport, EntityError};
use crate::extraction::{
    ContentExtractor, ExtractedContent, ExtractionLayer, ExtractionPipeline,
};
use crate::history::{ExistsState, HistoryError, TemporaryArea, TemporaryHistory};
use crate::metadata::{ContainerKind, Metadata, ModificationState};
use crate::provider::{Locator, ProviderError, StreamProvider, StreamProviderRegistry};
use crate::sink::{DataSink, SinkError};
use std::sync::Arc;
use std::time::Instant;

/// An entity waiting for its visit.
#[derive(Debug)]
struct Pending {
    locator: Locator,
    depth: usize,
    master_id: Option<String>,
}

/// The outcome of a successful visit.
#[derive(Debug)]
struct Visited {
    state: ModificationState,
    exists_id: String,
    children: Vec<Locator>,
}

/// Why a visit failed.
enum VisitError {
    /// The entity failed, the crawl may continue.
    Entity(Box<Metadata>, EntityError),
    Sink(String, SinkError),
}

fn history_error(err: HistoryError) -> EntityError {
    EntityError::Provider(ProviderError::History(err))
}

/// Walks a source depth first and classifies every entity against the history.
pub struct Crawler {
    registry: StreamProviderRegistry,
    pipeline: ExtractionPipeline,
    sink: Arc<dyn DataSink>,
}

/// Builds a [Crawler]. The extractor and the sink are mandatory.
#[derive(Default)]
pub struct CrawlerBuilder {
    registry: Option<StreamProviderRegistry>,
    extractor: Option<Arc<dyn ContentExtractor>>,
    sink: Option<Arc<dyn DataSink>>,
    layers: Vec<Arc<dyn ExtractionLayer>>,
}

impl CrawlerBuilder {
    pub fn registry(mut self, registry: StreamProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DataSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Adds a layer around the extractor, the first one is the outermost.
    pub fn layer(mut self, layer: Arc<dyn ExtractionLayer>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn build(self) -> Result<Crawler, ConfigError> {
        let extractor = self.extractor.ok_or(ConfigError::MissingExtractor)?;
        let sink = self.sink.ok_or(ConfigError::MissingSink)?;
        let pipeline = self
            .layers
            .into_iter()
            .fold(ExtractionPipeline::new(extractor), ExtractionPipeline::layer);
        Ok(Crawler {
            registry: self.registry.unwrap_or_default(),
            pipeline,
            sink,
        })
    }
}

impl Crawler {
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::default()
    }

    pub fn registry(&self) -> &StreamProviderRegistry {
        &self.registry
    }

    /// Crawls everything reachable from `locator` as one session.
    ///
    /// The history of the context is opened for the crawl and closed afterwards,
    /// without history and with cycle detection a temporary one is used. After a
    /// complete walk every entity that was not seen is reported as removed.
    pub async fn crawl(
        &self,
        locator: &Locator,
        context: &mut CrawlContext,
    ) -> Result<CrawlReport, CrawlError> {
        let _running = context.stop_signal().start();
        let started = Instant::now();

        if !self.registry.supports(locator.scheme()) {
            return Err(ConfigError::UnsupportedScheme {
                locator: locator.to_string(),
                scheme: locator.scheme().to_string(),
            }
            .into());
        }

        let temporary = if context.history().is_none() && context.cycle_detection() {
            let temporary = Self::acquire_temporary(context).map_err(|source| {
                CrawlError::History {
                    locator: locator.to_string(),
                    source,
                }
            })?;
            context.replace_history(Some(temporary.create_store()));
            Some(temporary)
        } else {
            None
        };

        log::info!("Start crawling {locator}");
        let result = self.walk(locator, context, temporary.is_none()).await;
        context.set_depth(0);

        let closed = match context.history_mut() {
            Some(history) => history.close(),
            None => Ok(()),
        };
        if let Some(temporary) = temporary {
            drop(context.replace_history(None));
            if let Err(err) = temporary.release() {
                log::warn!("Failed to clean up after crawling {locator}: {err}");
            }
        }

        let mut report = result?;
        closed.map_err(|source| CrawlError::History {
            locator: locator.to_string(),
            source,
        })?;
        report.elapsed = time::Duration::try_from(started.elapsed()).unwrap_or(time::Duration::MAX);
        log::info!("Finished crawling {locator}: {report}");
        Ok(report)
    }

    fn acquire_temporary(context: &CrawlContext) -> Result<TemporaryHistory, HistoryError> {
        match context.temp_area() {
            Some(area) => area.acquire(),
            None => TemporaryArea::system_default()?.acquire(),
        }
    }

    async fn walk(
        &self,
        root: &Locator,
        context: &mut CrawlContext,
        sweep: bool,
    ) -> Result<CrawlReport, CrawlError> {
        if let Some(history) = context.history_mut() {
            history
                .crawl_started()
                .map_err(|source| CrawlError::History {
                    locator: root.to_string(),
                    source,
                })?;
        }

        let mut report = CrawlReport::default();
        let mut pending = vec![Pending {
            locator: root.clone(),
            depth: 0,
            master_id: None,
        }];

        while let Some(entity) = pending.pop() {
            if context.is_stop_requested() {
                log::info!("Stopped before {}", entity.locator);
                report.stopped = true;
                break;
            }
            context.set_depth(entity.depth);
            let Some(visited) = self.visit(&entity, context, &mut report).await? else {
                continue;
            };
            report.count(visited.state);

            let depth = entity.depth + 1;
            let children = visited
                .children
                .into_iter()
                .filter(|child| {
                    if !self.registry.supports(child.scheme()) {
                        log::debug!("Skip {child}, the scheme is not supported.");
                        false
                    } else if !context.filter().accepts(child) {
                        log::debug!("Skip {child}, it is out of scope.");
                        false
                    } else {
                        true
                    }
                })
                .map(|locator| Pending {
                    locator,
                    depth,
                    master_id: Some(visited.exists_id.clone()),
                })
                .collect::<Vec<_>>();
            pending.extend(children.into_iter().rev());
        }

        if sweep && !report.stopped && context.check_removals() {
            self.sweep(root, context, &mut report).await?;
        }
        Ok(report)
    }

    /// Visits a single entity. Returns None if the entity failed and the crawl continues.
    async fn visit(
        &self,
        entity: &Pending,
        context: &CrawlContext,
        report: &mut CrawlReport,
    ) -> Result<Option<Visited>, CrawlError> {
        let classified = self.classify(entity, context).await;
        if let Ok(provider) = self.registry.get(entity.locator.scheme()) {
            provider.release(&entity.locator);
        }
        match classified {
            Ok(visited) => Ok(Some(visited)),
            Err(VisitError::Sink(locator, source)) => Err(CrawlError::Sink { locator, source }),
            Err(VisitError::Entity(_, err)) if err.is_fatal() => {
                Err(CrawlError::entity(&entity.locator, err))
            }
            Err(VisitError::Entity(mut metadata, err)) => {
                log::warn!("Failed to crawl {}: {err}", entity.locator);
                metadata.modification_state = Some(ModificationState::Error);
                self.sink
                    .on_error(&metadata, &err)
                    .await
                    .map_err(|source| CrawlError::Sink {
                        locator: entity.locator.to_string(),
                        source,
                    })?;
                report.count(ModificationState::Error);
                if context.interrupt_on_error() {
                    Err(CrawlError::entity(&entity.locator, err))
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn classify(
        &self,
        entity: &Pending,
        context: &CrawlContext,
    ) -> Result<Visited, VisitError> {
        let initial =
            Metadata::for_locator(&entity.locator).with_master_id(entity.master_id.clone());
        let fail = |metadata: &Metadata, err: EntityError| {
            VisitError::Entity(Box::new(metadata.clone()), err)
        };

        let provider = self
            .registry
            .get(entity.locator.scheme())
            .map_err(|err| fail(&initial, err.into()))?;
        let mut metadata = provider
            .add_first_metadata(&entity.locator, initial.clone(), context)
            .await
            .map_err(|err| fail(&initial, err.into()))?;
        let Some(exists_id) = metadata.exists_id.clone() else {
            let err = ProviderError::MissingIdentifier(entity.locator.to_string());
            return Err(fail(&metadata, err.into()));
        };
        let fingerprint = metadata.fingerprint.clone().unwrap_or_default();
        let master_id = entity.master_id.as_deref();

        let state = match context.history() {
            None => ModificationState::New,
            Some(history) => {
                let state = match history.exists(&exists_id) {
                    Ok(ExistsState::Processed) => Ok(ModificationState::Processed),
                    Ok(ExistsState::Not) => history
                        .add_entity(&exists_id, &fingerprint, master_id)
                        .map(|_| ModificationState::New),
                    Ok(ExistsState::Unprocessed) => {
                        match history.exists_with_fingerprint(&exists_id, &fingerprint) {
                            Ok(true) => history
                                .update_last_crawled_time(&exists_id)
                                .map(|_| ModificationState::Unmodified),
                            Ok(false) => history
                                .update_entity(&exists_id, &fingerprint, master_id)
                                .map(|_| ModificationState::Modified),
                            Err(err) => Err(err),
                        }
                    }
                    Err(err) => Err(err),
                };
                state.map_err(|err| fail(&metadata, history_error(err)))?
            }
        };
        metadata.modification_state = Some(state);
        if context.verbose() {
            log::info!("{state}: {}", metadata.display_name());
        } else {
            log::debug!("{state}: {}", metadata.display_name());
        }

        let descend = metadata.is_container() && context.allows_children_of(entity.depth);
        let children = match state {
            ModificationState::Processed => Vec::new(),
            ModificationState::Unmodified if !descend => Vec::new(),
            ModificationState::Unmodified => match metadata.container {
                Some(ContainerKind::Listing) => provider
                    .children(&entity.locator, &metadata, context)
                    .await
                    .map_err(|err| fail(&metadata, err.into()))?,
                Some(ContainerKind::Links) => {
                    self.extract(&**provider, entity, &metadata, context)
                        .await
                        .map_err(|err| fail(&metadata, err))?
                        .links
                }
                None => Vec::new(),
            },
            _ => {
                let content = match self
                    .extract(&**provider, entity, &metadata, context)
                    .await
                {
                    Ok(content) => content,
                    Err(err) => {
                        if let Some(history) = context.history() {
                            history
                                .update_entity(&exists_id, "", master_id)
                                .map_err(|err| fail(&metadata, history_error(err)))?;
                        }
                        return Err(fail(&metadata, err));
                    }
                };
                let children = match metadata.container {
                    Some(ContainerKind::Listing) if descend => provider
                        .children(&entity.locator, &metadata, context)
                        .await
                        .map_err(|err| fail(&metadata, err.into()))?,
                    Some(ContainerKind::Links) if descend => content.links.clone(),
                    _ => Vec::new(),
                };
                let notified = if state == ModificationState::New {
                    self.sink.on_new(&metadata, &content).await
                } else {
                    self.sink.on_modified(&metadata, &content).await
                };
                if let Err(err) = notified {
                    if let Some(history) = context.history() {
                        if let Err(reset) = history.update_entity(&exists_id, "", master_id) {
                            log::warn!("Failed to reset the fingerprint of {exists_id}: {reset}");
                        }
                    }
                    return Err(VisitError::Sink(entity.locator.to_string(), err));
                }
                children
            }
        };

        Ok(Visited {
            state,
            exists_id,
            children,
        })
    }

    async fn extract(
        &self,
        provider: &dyn StreamProvider,
        entity: &Pending,
        metadata: &Metadata,
        context: &CrawlContext,
    ) -> Result<ExtractedContent, EntityError> {
        let stream = provider
            .get_stream(&entity.locator, metadata, context)
            .await?;
        Ok(self.pipeline.extract(stream, metadata).await?)
    }

    /// Reports every entity that was not seen in the session as removed.
    async fn sweep(
        &self,
        root: &Locator,
        context: &mut CrawlContext,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlError> {
        let history_failed = |source: HistoryError| CrawlError::History {
            locator: root.to_string(),
            source,
        };
        loop {
            // One stale id at a time.
            let exists_id = match context.history_mut() {
                None => return Ok(()),
                Some(history) => history
                    .crawl_finished()
                    .map_err(history_failed)?
                    .next()
                    .transpose()
                    .map_err(history_failed)?,
            };
            let Some(exists_id) = exists_id else {
                return Ok(());
            };
            let mut metadata = Metadata::for_exists_id(exists_id);
            metadata.modification_state = Some(ModificationState::Removed);
            if context.verbose() {
                log::info!("REMOVED: {}", metadata.display_name());
            } else {
                log::debug!("REMOVED: {}", metadata.display_name());
            }
            self.sink
                .on_removed(&metadata)
                .await
                .map_err(|source| CrawlError::Sink {
                    locator: metadata.display_name().to_string(),
                    source,
                })?;
            report.count(ModificationState::Removed);
        }
    }
}
