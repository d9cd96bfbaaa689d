mod coalescing_test;
mod competing_consumers_test;
