use std::iter::Iterator;
use std::thread;

pub type Sender<T> = crossbeam_channel::Sender<T>;
pub type Receiver<T> = crossbeam_channel::Receiver<T>;

/// Marshall the output of parallel producers in sequence to a serial consumer
///
/// We are given a sequence of `producers` and a `consumer`.
///
/// The producers may be run in parallel in any order.
///
/// However, the consumer must be called sequentially with each of the
/// producers' output in the sequence given to the argument to this function.
///
/// Each producer is a closure that takes the `Sender` part of a channel
/// and returns a 'task' closure which is run in its own scoped thread.
/// The task sends its output as a single message to the channel and ends.
///
/// The first error returned by the consumer stops the marshalling: no further
/// producers are started and the error is returned once running ones finish.
/// A producer that panics stops the marshalling the same way and the panic is
/// propagated to the caller.
///
/// At any time the total number of running producers plus the number
///   of outputs waiting to be consumed will be less than or equal to
///   `max_inflight`
///
pub fn seq_rw_marshall<D, E, T, I, C>(
    producers: I,
    consumer: &mut C,
    max_inflight: usize,
) -> Result<(), E>
where
    I: Iterator,
    I::Item: FnOnce(Sender<D>) -> T, //Producer
    T: FnOnce() + Send,              //Task
    C: FnMut(D) -> Result<(), E> + Send,
    D: Send,
    E: Send,
{
    let max_inflight = max_inflight.max(1);
    let mut producers = producers.fuse();
    let mut inflight = 0usize;

    //Channels from which data for the consumer is to be received
    //  are themselves sent, in spawn order, on the jobs channel.
    //  The consumer acks each job so the main loop may spawn another.
    //  A consumer that fails drops its ack sender, which ends the main loop.
    thread::scope(|ts| {
        let (cons_jobs_s, cons_jobs_r) = crossbeam_channel::unbounded::<Receiver<D>>();
        let (cons_ack_s, cons_ack_r) = crossbeam_channel::unbounded::<()>();

        let cons = ts.spawn(move || -> Result<(), E> {
            for ch in cons_jobs_r {
                // a producer died without sending; its panic surfaces when
                // the scope joins it
                let Ok(job) = ch.recv() else { break };
                consumer(job)?;
                if cons_ack_s.send(()).is_err() {
                    break;
                }
            }
            Ok(())
        });

        loop {
            while inflight < max_inflight {
                let Some(prod) = producers.next() else { break };
                let (s, r) = crossbeam_channel::bounded::<D>(1);
                ts.spawn(prod(s));
                if cons_jobs_s.send(r).is_err() {
                    break;
                }
                inflight += 1;
            }
            if inflight == 0 || cons_ack_r.recv().is_err() {
                break;
            }
            inflight -= 1;
        }
        drop(cons_jobs_s);

        match cons.join() {
            Ok(r) => r,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}
