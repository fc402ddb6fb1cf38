mod batches;
mod lifecycle;
mod recovery;
mod repairs;
